//! JVM extractors: Spring, JAX-RS (Quarkus) and Micronaut routes,
//! entities and records, annotated controllers and services. Kotlin
//! sources are scanned alongside Java.

use lazy_static::lazy_static;
use regex::Regex;

use crate::extract::text::{action_names, brace_body_after, join_route, paren_body, MAX_FIELDS};
use crate::extract::{Controller, Field, Model, Route, Service, Workspace};

const JVM_GLOBS: &[&str] = &["**/*.java", "**/*.kt"];

lazy_static! {
    static ref CLASS_DECL: Regex = Regex::new(
        r"(?m)^[ \t]*(?:(?:public|protected|private|internal|abstract|final|static|open|data|sealed)\s+)*(class|record|interface|object)\s+(\w+)"
    )
    .unwrap();
    static ref ANNOTATION: Regex = Regex::new(r"@(\w+)(?:\([^)]*\))?").unwrap();
    static ref QUOTED: Regex = Regex::new(r#""([^"]*)""#).unwrap();
    static ref NAMED_PATH: Regex = Regex::new(r#"\b(?:value|path|uri)\s*=\s*\{?\s*"([^"]*)""#).unwrap();
    static ref NEXT_METHOD: Regex = Regex::new(
        r"\b(\w+)\s*\((?:[^()]|\([^()]*\))*\)\s*(?::\s*[^{=\n]+)?(?:throws\s+[^{]+)?[{=]"
    )
    .unwrap();

    static ref SPRING_TYPE: Regex = Regex::new(r"@RequestMapping\(([^)]*)\)").unwrap();
    static ref SPRING_VERB: Regex =
        Regex::new(r"@(Get|Post|Put|Delete|Patch)Mapping\b(?:\(([^)]*)\))?").unwrap();
    static ref SPRING_REQUEST: Regex = Regex::new(r"@RequestMapping\b(?:\(([^)]*)\))?").unwrap();
    static ref REQUEST_METHOD: Regex = Regex::new(r"RequestMethod\.(\w+)").unwrap();
    static ref JAXRS_PATH: Regex = Regex::new(r#"@Path\(\s*(?:value\s*=\s*)?"([^"]*)"\s*\)"#).unwrap();
    static ref JAXRS_VERB: Regex = Regex::new(r"@(GET|POST|PUT|DELETE|PATCH|HEAD|OPTIONS)\b").unwrap();
    static ref MICRONAUT_TYPE: Regex =
        Regex::new(r#"@Controller\(\s*(?:value\s*=\s*)?"([^"]*)""#).unwrap();
    static ref MICRONAUT_VERB: Regex =
        Regex::new(r"@(Get|Post|Put|Delete|Patch|Head|Options)\b(?:\(([^)]*)\))?").unwrap();

    static ref FIELD_DECL: Regex = Regex::new(
        r"(?m)^[ \t]*((?:(?:private|protected|public|final|static|transient|volatile)\s+)*)([\w<>\[\],.? ]+?)\s+(\w+)\s*(?:=[^;\n]*)?;"
    )
    .unwrap();
    static ref KOTLIN_PROPERTY: Regex =
        Regex::new(r"\b(?:val|var)\s+(\w+)\s*:\s*([\w<>?,. \[\]]+?)\s*(?:=|,|\)|$)").unwrap();
    static ref RECORD: Regex = Regex::new(r"\brecord\s+(\w+)\s*(?:<[^>]*>)?\s*\(").unwrap();
    static ref DATA_CLASS: Regex = Regex::new(r"\bdata\s+class\s+(\w+)\s*(?:<[^>]*>)?\s*\(").unwrap();
    static ref PUBLIC_METHOD: Regex = Regex::new(
        r"(?m)^[ \t]*public\s+(?:static\s+)?(?:final\s+)?(?:synchronized\s+)?(?:<[^>]*>\s*)?[\w<>\[\],.? ]+\s+(\w+)\s*\("
    )
    .unwrap();
    static ref KOTLIN_FUN: Regex = Regex::new(
        r"(?m)^[ \t]*(?:(?:override|suspend|open|public|operator)\s+)*fun\s+(?:<[^>]*>\s*)?(\w+)\s*\("
    )
    .unwrap();
}

/// A type declaration with the annotations written above it.
struct TypeDecl<'a> {
    name: String,
    annotations: &'a str,
    body: &'a str,
    start: usize,
}

/// Class, record, interface and object declarations in source order.
fn type_decls(content: &str) -> Vec<TypeDecl<'_>> {
    CLASS_DECL
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let head = &content[..whole.start()];
            let boundary = head.rfind(&[';', '}', '{'][..]).map(|p| p + 1).unwrap_or(0);
            let body = brace_body_after(content, whole.end()).unwrap_or("");
            Some(TypeDecl {
                name: caps[2].to_string(),
                annotations: &content[boundary..whole.start()],
                body,
                start: whole.start(),
            })
        })
        .collect()
}

fn has_annotation(annotations: &str, names: &[&str]) -> bool {
    ANNOTATION
        .captures_iter(annotations)
        .any(|c| names.contains(&&c[1]))
}

/// Text of `body` with every nested brace block removed.
fn top_level(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut depth = 0i32;
    for c in body.chars() {
        match c {
            '{' => depth += 1,
            '}' => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

/// Path argument of a mapping annotation: `value =`/`path =` if present,
/// otherwise a leading positional string.
fn mapping_path(args: &str) -> String {
    if let Some(named) = NAMED_PATH.captures(args) {
        return named[1].to_string();
    }
    let trimmed = args.trim_start().trim_start_matches('{').trim_start();
    if trimmed.starts_with('"') {
        if let Some(q) = QUOTED.captures(trimmed) {
            return q[1].to_string();
        }
    }
    String::new()
}

/// Start of the run of annotation (or blank) lines that ends `before`.
fn annotation_block_start(before: &str) -> usize {
    let mut start = before.rfind('\n').map(|p| p + 1).unwrap_or(0);
    while start > 0 {
        let prev = before[..start - 1].rfind('\n').map(|p| p + 1).unwrap_or(0);
        let line = before[prev..start - 1].trim();
        if !line.is_empty() && !line.starts_with('@') {
            break;
        }
        start = prev;
    }
    start
}

fn handler_after(text: &str) -> Option<String> {
    NEXT_METHOD
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .find(|name| !matches!(name.as_str(), "if" | "for" | "while" | "switch" | "catch" | "synchronized"))
}

fn jvm_sources(rel: &str) -> bool {
    !rel.contains("src/test/")
}

/// Spring MVC / WebFlux mapping annotations.
pub fn spring_routes(ws: &Workspace) -> Vec<Route> {
    ws.scan(JVM_GLOBS, |rel, content| {
        if jvm_sources(rel) {
            spring_file_routes(rel, content)
        } else {
            Vec::new()
        }
    })
}

pub(crate) fn spring_file_routes(rel: &str, content: &str) -> Vec<Route> {
    let mut routes = Vec::new();
    for decl in type_decls(content) {
        if !has_annotation(decl.annotations, &["RestController", "Controller"]) {
            continue;
        }
        let prefix = SPRING_TYPE
            .captures(decl.annotations)
            .map(|c| mapping_path(&c[1]))
            .unwrap_or_default();

        let mut found: Vec<(usize, Route)> = Vec::new();
        for caps in SPRING_VERB.captures_iter(decl.body) {
            let Some(whole) = caps.get(0) else { continue };
            let path = caps.get(2).map(|a| mapping_path(a.as_str())).unwrap_or_default();
            let handler = handler_after(&decl.body[whole.end()..]);
            found.push((whole.start(), Route::new(&caps[1], join_route(&prefix, &path), handler, rel)));
        }
        for caps in SPRING_REQUEST.captures_iter(decl.body) {
            let Some(whole) = caps.get(0) else { continue };
            let args = caps.get(1).map(|a| a.as_str()).unwrap_or("");
            let path = mapping_path(args);
            let handler = handler_after(&decl.body[whole.end()..]);
            let mut methods: Vec<String> =
                REQUEST_METHOD.captures_iter(args).map(|m| m[1].to_string()).collect();
            if methods.is_empty() {
                methods.push("ANY".to_string());
            }
            for method in methods {
                found.push((
                    whole.start(),
                    Route::new(&method, join_route(&prefix, &path), handler.clone(), rel),
                ));
            }
        }
        found.sort_by_key(|(at, _)| *at);
        routes.extend(found.into_iter().map(|(_, r)| r));
    }
    routes
}

/// JAX-RS `@Path` resources (Quarkus).
pub fn quarkus_routes(ws: &Workspace) -> Vec<Route> {
    ws.scan(JVM_GLOBS, |rel, content| {
        if jvm_sources(rel) {
            jaxrs_file_routes(rel, content)
        } else {
            Vec::new()
        }
    })
}

pub(crate) fn jaxrs_file_routes(rel: &str, content: &str) -> Vec<Route> {
    let mut routes = Vec::new();
    for decl in type_decls(content) {
        let Some(prefix) = JAXRS_PATH.captures(decl.annotations).map(|c| c[1].to_string()) else {
            continue;
        };
        for caps in JAXRS_VERB.captures_iter(decl.body) {
            let Some(whole) = caps.get(0) else { continue };
            let block_start = annotation_block_start(&decl.body[..whole.start()]);
            let after = &decl.body[whole.end()..];
            let method_at = NEXT_METHOD.find(after).map(|m| m.start()).unwrap_or(after.len());
            let block = format!("{} {}", &decl.body[block_start..whole.start()], &after[..method_at]);
            let sub = JAXRS_PATH.captures(&block).map(|c| c[1].to_string()).unwrap_or_default();
            routes.push(Route::new(&caps[1], join_route(&prefix, &sub), handler_after(after), rel));
        }
    }
    routes
}

/// Micronaut `@Controller` routes.
pub fn micronaut_routes(ws: &Workspace) -> Vec<Route> {
    ws.scan(JVM_GLOBS, |rel, content| {
        if jvm_sources(rel) {
            micronaut_file_routes(rel, content)
        } else {
            Vec::new()
        }
    })
}

pub(crate) fn micronaut_file_routes(rel: &str, content: &str) -> Vec<Route> {
    let mut routes = Vec::new();
    for decl in type_decls(content) {
        let Some(prefix) = MICRONAUT_TYPE.captures(decl.annotations).map(|c| c[1].to_string()) else {
            continue;
        };
        for caps in MICRONAUT_VERB.captures_iter(decl.body) {
            let Some(whole) = caps.get(0) else { continue };
            let path = caps.get(2).map(|a| mapping_path(a.as_str())).unwrap_or_default();
            let handler = handler_after(&decl.body[whole.end()..]);
            routes.push(Route::new(&caps[1], join_route(&prefix, &path), handler, rel));
        }
    }
    routes
}

/// JPA/Mongo entities, Lombok data classes, records and Kotlin data classes.
pub fn java_models(ws: &Workspace) -> Vec<Model> {
    ws.scan(JVM_GLOBS, |rel, content| {
        if jvm_sources(rel) {
            entity_models(rel, content)
        } else {
            Vec::new()
        }
    })
}

pub(crate) fn entity_models(rel: &str, content: &str) -> Vec<Model> {
    const ENTITY_ANNOTATIONS: &[&str] = &["Entity", "Table", "Document", "Data", "Embeddable", "Value"];

    let mut found: Vec<(usize, Model)> = Vec::new();

    for decl in type_decls(content) {
        if !has_annotation(decl.annotations, ENTITY_ANNOTATIONS) {
            continue;
        }
        let top = top_level(decl.body);
        let without_annotations = ANNOTATION.replace_all(&top, "");
        let mut fields: Vec<Field> = FIELD_DECL
            .captures_iter(&without_annotations)
            .filter(|c| !c[1].contains("static"))
            .filter(|c| !matches!(c[2].trim(), "return" | "package" | "import" | "throw"))
            .map(|c| Field::new(&c[3], c[2].trim()))
            .collect();
        fields.extend(
            KOTLIN_PROPERTY
                .captures_iter(&without_annotations)
                .map(|c| Field::new(&c[1], c[2].trim())),
        );
        fields.truncate(MAX_FIELDS);
        if let Some(model) = Model::new(&decl.name, fields, rel).non_empty() {
            found.push((decl.start, model));
        }
    }

    for pattern in [&*RECORD, &*DATA_CLASS] {
        for caps in pattern.captures_iter(content) {
            let Some(whole) = caps.get(0) else { continue };
            if found.iter().any(|(_, m)| m.name == caps[1]) {
                continue;
            }
            let Some(params) = paren_body(content, whole.end() - 1) else {
                continue;
            };
            let params = ANNOTATION.replace_all(params, "");
            let fields: Vec<Field> = split_generic_list(&params)
                .into_iter()
                .filter_map(component_field)
                .take(MAX_FIELDS)
                .collect();
            if let Some(model) = Model::new(&caps[1], fields, rel).non_empty() {
                found.push((whole.start(), model));
            }
        }
    }

    found.sort_by_key(|(at, _)| *at);
    found.into_iter().map(|(_, m)| m).collect()
}

/// Comma-separated list split that respects `<...>` generics.
fn split_generic_list(list: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth -= 1,
            ',' if depth == 0 => {
                pieces.push(list[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    pieces.push(list[start..].trim());
    pieces.into_iter().filter(|p| !p.is_empty()).collect()
}

/// `Type name` (Java record) or `val name: Type` (Kotlin) component.
fn component_field(component: &str) -> Option<Field> {
    let component = component.trim_start_matches("final ").trim();
    if let Some(rest) = component
        .strip_prefix("val ")
        .or_else(|| component.strip_prefix("var "))
    {
        let (name, ty) = rest.split_once(':')?;
        let ty = ty.split('=').next().unwrap_or(ty);
        return Some(Field::new(name.trim(), ty.trim()));
    }
    let (ty, name) = component.rsplit_once(char::is_whitespace)?;
    Some(Field::new(name.trim(), ty.trim()))
}

/// Public methods of classes carrying one of `annotations`.
fn annotated_units(content: &str, annotations: &[&str]) -> Vec<(String, Vec<String>)> {
    type_decls(content)
        .into_iter()
        .filter(|decl| has_annotation(decl.annotations, annotations))
        .map(|decl| {
            let top = top_level(decl.body);
            let methods = PUBLIC_METHOD
                .captures_iter(&top)
                .chain(KOTLIN_FUN.captures_iter(&top))
                .map(|c| c[1].to_string())
                .collect::<Vec<_>>();
            (decl.name, action_names(methods))
        })
        .collect()
}

/// `@RestController`, `@Controller` and JAX-RS `@Path` classes.
pub fn jvm_controllers(ws: &Workspace) -> Vec<Controller> {
    ws.scan(JVM_GLOBS, |rel, content| {
        if !jvm_sources(rel) {
            return Vec::new();
        }
        annotated_units(content, &["RestController", "Controller", "Path"])
            .into_iter()
            .filter_map(|(name, actions)| Controller::with_actions(name, actions, rel))
            .collect()
    })
}

/// `@Service`, `@ApplicationScoped` and `@Singleton` classes.
pub fn jvm_services(ws: &Workspace) -> Vec<Service> {
    ws.scan(JVM_GLOBS, |rel, content| {
        if !jvm_sources(rel) {
            return Vec::new();
        }
        annotated_units(content, &["Service", "ApplicationScoped", "Singleton"])
            .into_iter()
            .filter_map(|(name, functions)| Service::with_functions(name, functions, rel))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPRING: &str = r#"
package com.example.web;

import org.springframework.web.bind.annotation.*;

/**
 * Users API. See {@link UserService}.
 */
@RestController
@RequestMapping("/api/users")
public class UserController {

    private final UserService service;

    public UserController(UserService service) {
        this.service = service;
    }

    @GetMapping
    public List<User> list() {
        return service.findAll();
    }

    @GetMapping(value = "/{id}", produces = "application/json")
    public ResponseEntity<User> get(@PathVariable("id") Long id) {
        if (id == null) { return null; }
        return ResponseEntity.ok(service.find(id));
    }

    @RequestMapping(path = "/search", method = RequestMethod.POST)
    public List<User> search(@RequestBody Query q) { return null; }

    @DeleteMapping("/{id}")
    @PreAuthorize("hasRole('ADMIN')")
    public void delete(@PathVariable Long id) {}

    private void audit() {}
}
"#;

    #[test]
    fn test_spring_routes_with_class_prefix() {
        let routes = spring_file_routes("UserController.java", SPRING);
        let summary: Vec<(&str, &str, Option<&str>)> = routes
            .iter()
            .map(|r| (r.method.as_str(), r.path.as_str(), r.handler.as_deref()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("GET", "/api/users", Some("list")),
                ("GET", "/api/users/:id", Some("get")),
                ("POST", "/api/users/search", Some("search")),
                ("DELETE", "/api/users/:id", Some("delete")),
            ]
        );
    }

    #[test]
    fn test_spring_controller_actions() {
        let units = annotated_units(SPRING, &["RestController"]);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].0, "UserController");
        assert_eq!(units[0].1, vec!["list", "get", "search", "delete"]);
    }

    #[test]
    fn test_jaxrs_resource() {
        let src = r#"
@Path("/fruits")
@Produces(MediaType.APPLICATION_JSON)
public class FruitResource {
    @GET
    public List<Fruit> list() { return List.of(); }

    @GET
    @Path("/{id}")
    public Fruit get(@PathParam("id") long id) { return null; }

    @Path("/{id}")
    @DELETE
    public void remove(@PathParam("id") long id) {}
}
"#;
        let routes = jaxrs_file_routes("FruitResource.java", src);
        let summary: Vec<(&str, &str, Option<&str>)> = routes
            .iter()
            .map(|r| (r.method.as_str(), r.path.as_str(), r.handler.as_deref()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("GET", "/fruits", Some("list")),
                ("GET", "/fruits/:id", Some("get")),
                ("DELETE", "/fruits/:id", Some("remove")),
            ]
        );
    }

    #[test]
    fn test_micronaut_controller() {
        let src = "@Controller(\"/books\")\nclass BookController {\n    @Get(\"/{isbn}\")\n    fun show(isbn: String): Book = repo.find(isbn)\n\n    @Post\n    fun save(@Body book: Book): Book { return book }\n}\n";
        let routes = micronaut_file_routes("BookController.kt", src);
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].path, "/books/:isbn");
        assert_eq!(routes[0].handler.as_deref(), Some("show"));
        assert_eq!(routes[1].method, "POST");
        assert_eq!(routes[1].path, "/books");
    }

    #[test]
    fn test_entity_and_record_models() {
        let src = r#"
@Entity
@Table(name = "orders")
public class Order {
    private static final long serialVersionUID = 1L;

    @Id
    @GeneratedValue(strategy = GenerationType.IDENTITY)
    private Long id;

    @Column(nullable = false)
    private String customer;

    private Map<String, Integer> quantities = new HashMap<>();

    public Long getId() {
        Long local = id;
        return local;
    }
}

public record Money(BigDecimal amount, Map<String, String> meta) {}

data class Point(val x: Int, val y: Int = 0)
"#;
        let models = entity_models("Order.java", src);
        let names: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Order", "Money", "Point"]);
        assert_eq!(
            models[0].fields,
            vec![
                Field::new("id", "Long"),
                Field::new("customer", "String"),
                Field::new("quantities", "Map<String, Integer>"),
            ]
        );
        assert_eq!(models[1].fields[1], Field::new("meta", "Map<String, String>"));
        assert_eq!(models[2].fields[1], Field::new("y", "Int"));
    }

    #[test]
    fn test_service_units() {
        let src = "@Service\npublic class BillingService {\n    public Invoice charge(Order o) { return null; }\n    protected void log() {}\n}\n\n@ApplicationScoped\nclass Clock {\n    fun now(): Long = 0\n}\n";
        let units = annotated_units(src, &["Service", "ApplicationScoped"]);
        assert_eq!(units[0], ("BillingService".to_string(), vec!["charge".to_string()]));
        assert_eq!(units[1], ("Clock".to_string(), vec!["now".to_string()]));
    }
}
