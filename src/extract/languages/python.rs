//! Python extractors: Django, Flask and FastAPI routes, Django models,
//! SQLAlchemy/Pydantic/dataclass models, views and service modules.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

use crate::extract::text::{
    action_names, file_stem, indent_of, indented_body, join_route, line_start, normalize_route,
    paren_body, MAX_FIELDS,
};
use crate::extract::{Controller, Field, Model, Route, Service, Workspace};

const PY_GLOBS: &[&str] = &["**/*.py"];
const URL_GLOBS: &[&str] = &["**/urls.py", "**/urls/*.py"];
const DJANGO_MODEL_GLOBS: &[&str] = &["**/models.py", "**/models/*.py"];
const VIEW_GLOBS: &[&str] = &["**/views.py", "**/views/*.py", "**/viewsets.py", "**/api/*.py"];
const SERVICE_GLOBS: &[&str] = &["**/services/**/*.py", "**/*service*.py"];

lazy_static! {
    static ref URL_PATTERN: Regex = Regex::new(
        r#"\b(path|re_path|url)\(\s*r?['"]([^'"]*)['"]\s*,\s*([\w.]+)"#
    )
    .unwrap();
    static ref ROUTE_DECORATOR: Regex =
        Regex::new(r#"(?m)^\s*@(\w+)\.route(\()\s*['"]([^'"]*)['"]"#).unwrap();
    static ref VERB_DECORATOR: Regex = Regex::new(
        r#"(?m)^\s*@(\w+)\.(get|post|put|patch|delete|options|head)\(\s*['"]([^'"]*)['"]"#
    )
    .unwrap();
    static ref METHODS_ARG: Regex = Regex::new(r"methods\s*=\s*[\[(]([^\])]*)[\])]").unwrap();
    static ref QUOTED_WORD: Regex = Regex::new(r#"['"](\w+)['"]"#).unwrap();
    static ref NEXT_DEF: Regex = Regex::new(r"(?m)^\s*(?:async\s+)?def\s+(\w+)").unwrap();
    static ref ROUTER_DECL: Regex = Regex::new(
        r"(?m)^(\w+)\s*=\s*(?:\w+\.)?(?:APIRouter|Blueprint)\(([^)]*)\)"
    )
    .unwrap();
    static ref PREFIX_ARG: Regex =
        Regex::new(r#"\b(?:url_)?prefix\s*=\s*['"]([^'"]*)['"]"#).unwrap();
    static ref CLASS: Regex = Regex::new(r"(?m)^([ \t]*)class\s+(\w+)\s*(?:\(([^)]*)\))?\s*:").unwrap();
    static ref DJANGO_FIELD: Regex = Regex::new(
        r"^(\w+)\s*=\s*(?:models\.)?(\w*(?:Field|ForeignKey|OneToOneField|ManyToManyField))\("
    )
    .unwrap();
    static ref COLUMN_FIELD: Regex = Regex::new(
        r"^(\w+)\s*(?::\s*[^=]+)?=\s*(?:\w+\.)?(?:Column|mapped_column)\(\s*(?:\w+\.)?([A-Z]\w*)?"
    )
    .unwrap();
    static ref MAPPED_FIELD: Regex = Regex::new(r"^(\w+)\s*:\s*Mapped\[(.+)\]").unwrap();
    static ref ANNOTATED_FIELD: Regex = Regex::new(r"^(\w+)\s*:\s*([^=#]+?)\s*(?:=.*)?$").unwrap();
    static ref SELF_METHOD: Regex =
        Regex::new(r"(?m)^\s*(?:async\s+)?def\s+(\w+)\(\s*(?:self|cls)\b").unwrap();
    static ref ANY_METHOD: Regex = Regex::new(r"(?m)^\s*(?:async\s+)?def\s+(\w+)\(").unwrap();
    static ref MODULE_FUNCTION: Regex = Regex::new(r"(?m)^(?:async\s+)?def\s+(\w+)\(\s*(\w*)").unwrap();
}

/// Django `urls.py` patterns.
pub fn django_routes(ws: &Workspace) -> Vec<Route> {
    ws.scan(URL_GLOBS, urlconf_routes)
}

pub(crate) fn urlconf_routes(rel: &str, content: &str) -> Vec<Route> {
    URL_PATTERN
        .captures_iter(content)
        .filter(|caps| &caps[3] != "include")
        .map(|caps| Route::new("ANY", normalize_route(&caps[2]), Some(caps[3].to_string()), rel))
        .collect()
}

/// Flask `@app.route` / `@bp.get` decorators.
pub fn flask_routes(ws: &Workspace) -> Vec<Route> {
    ws.scan(PY_GLOBS, decorator_routes)
}

/// FastAPI `@app.get` / `@router.post` decorators.
pub fn fastapi_routes(ws: &Workspace) -> Vec<Route> {
    ws.scan(PY_GLOBS, decorator_routes)
}

/// Routes declared by decorators, with `APIRouter(prefix=..)` and
/// `Blueprint(url_prefix=..)` prefixes applied to their own variable.
pub(crate) fn decorator_routes(rel: &str, content: &str) -> Vec<Route> {
    let prefixes: HashMap<String, String> = ROUTER_DECL
        .captures_iter(content)
        .filter_map(|caps| {
            let prefix = PREFIX_ARG.captures(&caps[2])?;
            Some((caps[1].to_string(), prefix[1].to_string()))
        })
        .collect();
    let prefixed = |owner: &str, path: &str| match prefixes.get(owner) {
        Some(prefix) => join_route(prefix, path),
        None => normalize_route(path),
    };

    // (offset, route) so that both decorator forms come out in source order
    let mut found: Vec<(usize, Route)> = Vec::new();

    for caps in ROUTE_DECORATOR.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        let handler = handler_after(content, whole.end());
        let path = prefixed(&caps[1], &caps[3]);
        let args = caps
            .get(2)
            .and_then(|open| paren_body(content, open.start()))
            .unwrap_or("");
        let methods: Vec<String> = METHODS_ARG
            .captures(args)
            .map(|m| QUOTED_WORD.captures_iter(&m[1]).map(|q| q[1].to_string()).collect())
            .unwrap_or_default();
        if methods.is_empty() {
            found.push((whole.start(), Route::new("GET", path, handler, rel)));
        } else {
            for method in methods {
                found.push((whole.start(), Route::new(&method, path.clone(), handler.clone(), rel)));
            }
        }
    }

    for caps in VERB_DECORATOR.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        let handler = handler_after(content, whole.end());
        let path = prefixed(&caps[1], &caps[3]);
        found.push((whole.start(), Route::new(&caps[2], path, handler, rel)));
    }

    found.sort_by_key(|(at, _)| *at);
    found.into_iter().map(|(_, route)| route).collect()
}

fn handler_after(content: &str, from: usize) -> Option<String> {
    NEXT_DEF.captures(&content[from..]).map(|c| c[1].to_string())
}

/// Django `models.Model` subclasses.
pub fn django_models(ws: &Workspace) -> Vec<Model> {
    ws.scan(DJANGO_MODEL_GLOBS, |rel, content| {
        class_models(rel, content, |bases| bases.contains("Model"))
    })
}

/// SQLAlchemy, Pydantic, SQLModel and dataclass models.
pub fn python_models(ws: &Workspace) -> Vec<Model> {
    ws.scan(PY_GLOBS, |rel, content| class_models(rel, content, is_model_base))
}

fn is_model_base(bases: &str) -> bool {
    bases.split(',').map(str::trim).any(|base| {
        let base = base.rsplit('.').next().unwrap_or(base);
        matches!(
            base,
            "Model" | "Base" | "DeclarativeBase" | "BaseModel" | "SQLModel" | "Document" | "Schema"
        ) || base.ends_with("Base")
    })
}

/// Classes accepted by `qualifies` (or decorated with `@dataclass`) and their
/// fields. Classes without fields are dropped.
pub(crate) fn class_models<F>(rel: &str, content: &str, qualifies: F) -> Vec<Model>
where
    F: Fn(&str) -> bool,
{
    CLASS
        .captures_iter(content)
        .filter_map(|caps| {
            let at = caps.get(0)?.start();
            let bases = caps.get(3).map(|b| b.as_str()).unwrap_or("");
            if !qualifies(bases) && !is_dataclass(content, at) {
                return None;
            }
            let body = indented_body(content, at);
            Model::new(&caps[2], class_fields(body), rel).non_empty()
        })
        .collect()
}

fn is_dataclass(content: &str, class_at: usize) -> bool {
    let start = line_start(content, class_at);
    content[..start]
        .lines()
        .rev()
        .take_while(|line| line.trim_start().starts_with('@'))
        .any(|line| line.contains("dataclass"))
}

/// Field declarations at the top level of a class body.
fn class_fields(body: &str) -> Vec<Field> {
    let level = match body.lines().find(|l| !l.trim().is_empty()) {
        Some(first) => indent_of(first),
        None => return Vec::new(),
    };

    let mut fields = Vec::new();
    for line in body.lines() {
        if line.trim().is_empty() || indent_of(line) != level {
            continue;
        }
        let stmt = line.trim();
        if stmt.starts_with('_') || stmt.starts_with("model_config") || stmt.starts_with("class ") {
            continue;
        }

        let field = if let Some(c) = DJANGO_FIELD.captures(stmt) {
            Some(Field::new(&c[1], &c[2]))
        } else if let Some(c) = MAPPED_FIELD.captures(stmt) {
            Some(Field::new(&c[1], c[2].trim()))
        } else if let Some(c) = COLUMN_FIELD.captures(stmt) {
            Some(Field::new(&c[1], c.get(2).map(|t| t.as_str()).unwrap_or("Column")))
        } else if stmt.starts_with("def ") || stmt.starts_with("async ") || stmt.starts_with('@') {
            None
        } else {
            ANNOTATED_FIELD
                .captures(stmt)
                .filter(|c| !c[2].starts_with("ClassVar"))
                .map(|c| Field::new(&c[1], c[2].trim()))
        };

        if let Some(field) = field {
            fields.push(field);
            if fields.len() >= MAX_FIELDS {
                break;
            }
        }
    }
    fields
}

/// Django class-based views and function views.
pub fn django_controllers(ws: &Workspace) -> Vec<Controller> {
    ws.scan(VIEW_GLOBS, view_controllers)
}

pub(crate) fn view_controllers(rel: &str, content: &str) -> Vec<Controller> {
    let mut controllers: Vec<Controller> = CLASS
        .captures_iter(content)
        .filter(|caps| caps[1].is_empty())
        .filter(|caps| {
            let bases = caps.get(3).map(|b| b.as_str()).unwrap_or("");
            bases.contains("View") || bases.contains("ViewSet") || bases.contains("Mixin")
        })
        .filter_map(|caps| {
            let body = indented_body(content, caps.get(0)?.start());
            let actions = public_methods(body, &SELF_METHOD);
            Controller::with_actions(&caps[2], actions, rel)
        })
        .collect();

    let function_views = action_names(
        MODULE_FUNCTION
            .captures_iter(content)
            .filter(|c| &c[2] == "request")
            .map(|c| c[1].to_string()),
    );
    if let Some(views) = Controller::with_actions(module_name(rel), function_views, rel) {
        controllers.push(views);
    }
    controllers
}

/// Service classes and service modules.
pub fn python_services(ws: &Workspace) -> Vec<Service> {
    ws.scan(SERVICE_GLOBS, service_units)
}

pub(crate) fn service_units(rel: &str, content: &str) -> Vec<Service> {
    let mut services: Vec<Service> = CLASS
        .captures_iter(content)
        .filter(|caps| caps[1].is_empty())
        .filter_map(|caps| {
            let body = indented_body(content, caps.get(0)?.start());
            Service::with_functions(&caps[2], public_methods(body, &ANY_METHOD), rel)
        })
        .collect();

    let functions = action_names(
        MODULE_FUNCTION
            .captures_iter(content)
            .map(|c| c[1].to_string())
            .filter(|n| !n.starts_with('_')),
    );
    if let Some(module) = Service::with_functions(module_name(rel), functions, rel) {
        services.push(module);
    }
    services
}

fn public_methods(body: &str, pattern: &Regex) -> Vec<String> {
    action_names(
        pattern
            .captures_iter(body)
            .map(|c| c[1].to_string())
            .filter(|n| !n.starts_with('_')),
    )
}

/// `blog/views.py` -> `blog.views`.
fn module_name(rel: &str) -> String {
    let stem = file_stem(rel);
    let parent = rel.rsplit('/').nth(1);
    match parent {
        Some(dir) => format!("{}.{}", dir, stem),
        None => stem.to_string(),
    }
}
