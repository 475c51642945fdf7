//! ASP.NET Core extractors: attribute-routed controllers, minimal APIs,
//! auto-property models, Razor components and service classes.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use crate::extract::text::{action_names, brace_body_after, file_stem, join_route, MAX_FIELDS};
use crate::extract::{Component, Controller, Field, Model, Route, Service, Workspace};

const CS_GLOBS: &[&str] = &["**/*.cs"];

lazy_static! {
    static ref CLASS_DECL: Regex = Regex::new(
        r"(?m)^[ \t]*(?:(?:public|internal|private|protected|sealed|abstract|static|partial)\s+)*class\s+(\w+)(?:<[^>]*>)?(?:\s*:\s*([\w.<>, ]+?))?\s*(?:where\s[^{]*)?\{"
    )
    .unwrap();
    static ref RECORD_DECL: Regex = Regex::new(
        r"(?m)^[ \t]*(?:(?:public|internal|sealed)\s+)*record\s+(?:class\s+|struct\s+)?(\w+)\s*\(([^)]*)\)"
    )
    .unwrap();
    static ref ROUTE_ATTR: Regex = Regex::new(r#"\[Route\(\s*"([^"]*)"\s*\)\]"#).unwrap();
    static ref HTTP_ATTR: Regex = Regex::new(
        r#"\[Http(Get|Post|Put|Delete|Patch|Head|Options)(?:\(\s*(?:template:\s*)?"([^"]*)"[^)]*\))?\]"#
    )
    .unwrap();
    static ref PUBLIC_METHOD: Regex = Regex::new(
        r"(?m)^[ \t]*public\s+(?:(?:async|virtual|override|static|new)\s+)*[\w<>\[\]?,. ]+?\s+(\w+)\s*(?:<[^>]*>)?\s*\("
    )
    .unwrap();
    static ref MAP_CALL: Regex =
        Regex::new(r#"(\w+)\.Map(Get|Post|Put|Delete|Patch|Methods)\(\s*"([^"]*)"\s*,\s*([^\n]*)"#).unwrap();
    static ref MAP_GROUP: Regex =
        Regex::new(r#"(\w+)\s*=\s*(\w+)\.MapGroup\(\s*"([^"]*)"\s*\)"#).unwrap();
    static ref METHOD_GROUP: Regex = Regex::new(r"^([\w.]+)\s*\)").unwrap();
    static ref AUTO_PROPERTY: Regex = Regex::new(
        r"(?m)^[ \t]*public\s+(?:(?:required|virtual|override|new)\s+)*([\w<>\[\]?,. ]+?)\s+(\w+)\s*\{\s*get;"
    )
    .unwrap();
    static ref PARAMETER_PROPERTY: Regex = Regex::new(
        r"\[(?:Parameter|CascadingParameter)\b[^\]]*\](?:\s*\[[^\]]*\])*\s*public\s+(?:required\s+)?[\w<>\[\]?,. ]+?\s+(\w+)\s*\{"
    )
    .unwrap();
}

struct ClassDecl<'a> {
    name: String,
    bases: String,
    attributes: &'a str,
    body: &'a str,
}

fn class_decls(content: &str) -> Vec<ClassDecl<'_>> {
    CLASS_DECL
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let head = &content[..whole.start()];
            let boundary = head.rfind(&[';', '}', '{'][..]).map(|p| p + 1).unwrap_or(0);
            Some(ClassDecl {
                name: caps[1].to_string(),
                bases: caps.get(2).map(|b| b.as_str().to_string()).unwrap_or_default(),
                attributes: &content[boundary..whole.start()],
                body: brace_body_after(content, whole.end() - 1)?,
            })
        })
        .collect()
}

fn is_controller(decl: &ClassDecl<'_>) -> bool {
    decl.name.ends_with("Controller") && decl.bases.contains("Controller")
}

fn handler_after(text: &str) -> Option<String> {
    PUBLIC_METHOD.captures(text).map(|c| c[1].to_string())
}

/// Attribute-routed controllers and minimal API endpoints.
pub fn dotnet_routes(ws: &Workspace) -> Vec<Route> {
    ws.scan(CS_GLOBS, |rel, content| {
        let mut routes = controller_routes(rel, content);
        routes.extend(minimal_api_routes(rel, content));
        routes
    })
}

pub(crate) fn controller_routes(rel: &str, content: &str) -> Vec<Route> {
    let mut routes = Vec::new();
    for decl in class_decls(content) {
        if !is_controller(&decl) {
            continue;
        }
        let short = decl.name.trim_end_matches("Controller");
        let prefix = ROUTE_ATTR
            .captures(decl.attributes)
            .map(|c| c[1].replace("[controller]", short))
            .unwrap_or_default();

        for caps in HTTP_ATTR.captures_iter(decl.body) {
            let Some(whole) = caps.get(0) else { continue };
            let handler = handler_after(&decl.body[whole.end()..]);
            let template = caps.get(2).map_or("", |t| t.as_str());
            let template = match &handler {
                Some(action) => template.replace("[action]", action),
                None => template.to_string(),
            };
            let path = match template.strip_prefix("~/") {
                Some(absolute) => join_route("", absolute),
                None if template.starts_with('/') => join_route("", &template),
                None => join_route(&prefix, &template),
            };
            routes.push(Route::new(&caps[1], path, handler, rel));
        }
    }
    routes
}

pub(crate) fn minimal_api_routes(rel: &str, content: &str) -> Vec<Route> {
    let mut groups: HashMap<String, String> = HashMap::new();
    for caps in MAP_GROUP.captures_iter(content) {
        let parent = groups.get(&caps[2]).cloned().unwrap_or_default();
        groups.insert(caps[1].to_string(), join_route(&parent, &caps[3]));
    }

    MAP_CALL
        .captures_iter(content)
        .map(|caps| {
            let prefix = groups.get(&caps[1]).map(String::as_str).unwrap_or("");
            let method = if &caps[2] == "Methods" { "ANY" } else { &caps[2] };
            let handler = METHOD_GROUP.captures(caps[4].trim()).map(|h| h[1].to_string());
            Route::new(method, join_route(prefix, &caps[3]), handler, rel)
        })
        .collect()
}

/// Classes with auto-properties and positional records.
pub fn dotnet_models(ws: &Workspace) -> Vec<Model> {
    ws.scan(CS_GLOBS, property_models)
}

pub(crate) fn property_models(rel: &str, content: &str) -> Vec<Model> {
    let mut models = Vec::new();
    for decl in class_decls(content) {
        if is_controller(&decl) || decl.bases.contains("DbContext") || decl.bases.contains("PageModel") {
            continue;
        }
        let fields: Vec<Field> = AUTO_PROPERTY
            .captures_iter(decl.body)
            .map(|p| Field::new(&p[2], p[1].trim()))
            .take(MAX_FIELDS)
            .collect();
        if let Some(model) = Model::new(decl.name, fields, rel).non_empty() {
            models.push(model);
        }
    }
    for caps in RECORD_DECL.captures_iter(content) {
        let fields: Vec<Field> = caps[2]
            .split(',')
            .filter_map(|param| {
                let (ty, name) = param.trim().rsplit_once(char::is_whitespace)?;
                Some(Field::new(name, ty.trim()))
            })
            .take(MAX_FIELDS)
            .collect();
        if let Some(model) = Model::new(&caps[1], fields, rel).non_empty() {
            models.push(model);
        }
    }
    models
}

fn public_units<'a>(decls: impl IntoIterator<Item = ClassDecl<'a>>) -> Vec<(String, Vec<String>)> {
    decls
        .into_iter()
        .map(|decl| {
            let methods = PUBLIC_METHOD
                .captures_iter(decl.body)
                .map(|m| m[1].to_string())
                .collect::<Vec<_>>();
            (decl.name, action_names(methods))
        })
        .collect()
}

/// `XController : ControllerBase` public actions.
pub fn dotnet_controllers(ws: &Workspace) -> Vec<Controller> {
    ws.scan(CS_GLOBS, |rel, content| {
        public_units(class_decls(content).into_iter().filter(is_controller))
            .into_iter()
            .filter_map(|(name, actions)| Controller::with_actions(name, actions, rel))
            .collect()
    })
}

/// Razor components and their `[Parameter]` properties.
pub fn razor_components(ws: &Workspace) -> Vec<Component> {
    ws.scan(&["**/*.razor"], razor_component)
}

pub(crate) fn razor_component(rel: &str, content: &str) -> Vec<Component> {
    let name = file_stem(rel);
    if matches!(name, "_Imports" | "App" | "Routes") {
        return Vec::new();
    }
    let props = PARAMETER_PROPERTY
        .captures_iter(content)
        .map(|p| p[1].to_string())
        .collect();
    vec![Component::new(name, props, rel)]
}

/// Classes named `*Service`.
pub fn dotnet_services(ws: &Workspace) -> Vec<Service> {
    ws.scan(CS_GLOBS, |rel, content| {
        public_units(
            class_decls(content)
                .into_iter()
                .filter(|decl| decl.name.ends_with("Service")),
        )
        .into_iter()
        .filter_map(|(name, functions)| Service::with_functions(name, functions, rel))
        .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTROLLER: &str = r#"
using Microsoft.AspNetCore.Mvc;

namespace Shop.Api.Controllers;

[ApiController]
[Route("api/[controller]")]
public class ProductsController : ControllerBase
{
    private readonly IProductService _service;

    public ProductsController(IProductService service)
    {
        _service = service;
    }

    [HttpGet]
    public async Task<ActionResult<IEnumerable<Product>>> GetAll()
    {
        return Ok(await _service.ListAsync());
    }

    [HttpGet("{id:int}")]
    public ActionResult<Product> GetById(int id) => Ok();

    [HttpPost("[action]")]
    public IActionResult Import([FromBody] ImportRequest request) => Accepted();

    [HttpDelete("~/admin/products/{id}")]
    public IActionResult Purge(int id) => NoContent();
}
"#;

    #[test]
    fn test_attribute_routes_with_controller_token() {
        let routes = controller_routes("Controllers/ProductsController.cs", CONTROLLER);
        let summary: Vec<(&str, &str, Option<&str>)> = routes
            .iter()
            .map(|r| (r.method.as_str(), r.path.as_str(), r.handler.as_deref()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("GET", "/api/Products", Some("GetAll")),
                ("GET", "/api/Products/:id", Some("GetById")),
                ("POST", "/api/Products/Import", Some("Import")),
                ("DELETE", "/admin/products/:id", Some("Purge")),
            ]
        );
    }

    #[test]
    fn test_controller_actions_skip_constructor() {
        let units = public_units(class_decls(CONTROLLER).into_iter().filter(is_controller));
        assert_eq!(units[0].0, "ProductsController");
        assert_eq!(units[0].1, vec!["GetAll", "GetById", "Import", "Purge"]);
    }

    #[test]
    fn test_minimal_api_routes() {
        let src = r#"
var app = builder.Build();
var api = app.MapGroup("/api");
var todos = api.MapGroup("/todos");
app.MapGet("/", () => "Hello");
todos.MapGet("/{id}", GetTodo);
todos.MapPost("/", async (Todo todo, TodoDb db) => { db.Add(todo); });
"#;
        let routes = minimal_api_routes("Program.cs", src);
        let summary: Vec<(&str, &str, Option<&str>)> = routes
            .iter()
            .map(|r| (r.method.as_str(), r.path.as_str(), r.handler.as_deref()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("GET", "/", None),
                ("GET", "/api/todos/:id", Some("GetTodo")),
                ("POST", "/api/todos", None),
            ]
        );
    }

    #[test]
    fn test_property_models_and_records() {
        let src = r#"
public class Customer
{
    public int Id { get; set; }
    public required string Email { get; init; }
    public List<Order> Orders { get; set; } = new();
    public string Display() => Email;
}

public class ShopContext : DbContext
{
    public DbSet<Customer> Customers { get; set; }
}

public record Address(string Street, string City);
"#;
        let models = property_models("Models/Customer.cs", src);
        let names: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Customer", "Address"]);
        assert_eq!(
            models[0].fields,
            vec![
                Field::new("Id", "int"),
                Field::new("Email", "string"),
                Field::new("Orders", "List<Order>"),
            ]
        );
        assert_eq!(models[1].fields[1], Field::new("City", "string"));
    }

    #[test]
    fn test_razor_parameters() {
        let src = "<h3>@Title</h3>\n@code {\n    [Parameter]\n    public string Title { get; set; } = \"\";\n\n    [Parameter, EditorRequired]\n    public EventCallback<int> OnChange { get; set; }\n\n    private int count;\n}\n";
        let components = razor_component("Shared/Counter.razor", src);
        assert_eq!(components[0].name, "Counter");
        assert_eq!(components[0].props, vec!["Title", "OnChange"]);
        assert!(razor_component("_Imports.razor", "@using X").is_empty());
    }
}
