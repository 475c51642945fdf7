//! Rust extractors: actix-web, rocket, axum and warp routes, structs and
//! service-like `impl` blocks.

use lazy_static::lazy_static;
use regex::Regex;

use crate::extract::text::{action_names, brace_body, normalize_route, paren_body, MAX_FIELDS};
use crate::extract::{Field, Model, Route, Service, Workspace};

const RS_GLOBS: &[&str] = &["**/*.rs"];

lazy_static! {
    static ref VERB_ATTR: Regex = Regex::new(
        r#"#\[(?:\w+::)?(get|post|put|patch|delete|head|options)\(\s*"([^"]*)""#
    )
    .unwrap();
    static ref ROUTE_ATTR: Regex = Regex::new(r#"#\[(?:\w+::)?route\(\s*"([^"]*)"([^\]]*)\]"#).unwrap();
    static ref ATTR_METHOD: Regex = Regex::new(r#"method\s*=\s*"(\w+)""#).unwrap();
    static ref NEXT_FN: Regex = Regex::new(r"\bfn\s+(\w+)").unwrap();
    static ref ACTIX_ROUTE: Regex = Regex::new(
        r#"\.route\(\s*"([^"]*)"\s*,\s*web::(get|post|put|patch|delete|head)\(\)\s*\.to\(\s*([\w:]+)"#
    )
    .unwrap();
    static ref ACTIX_RESOURCE: Regex = Regex::new(r#"web::resource\(\s*"([^"]*)"\s*\)"#).unwrap();
    static ref CHAINED_TO: Regex = Regex::new(
        r"^\s*\.(?:route\(\s*web::(get|post|put|patch|delete|head)\(\)\s*\.to\(\s*([\w:]+)\s*\)\s*\)|to\(\s*([\w:]+)\s*\))"
    )
    .unwrap();
    static ref AXUM_ROUTE: Regex = Regex::new(r#"\.route\(\s*"([^"]*)"\s*,"#).unwrap();
    static ref AXUM_METHOD: Regex =
        Regex::new(r"\b(get|post|put|patch|delete|head|options|any)\s*\(\s*([\w:]+)?").unwrap();
    static ref WARP_PATH_MACRO: Regex = Regex::new(r"warp::path!\(([^)]*)\)").unwrap();
    static ref WARP_PATH_FN: Regex = Regex::new(r#"warp::path\(\s*"([^"]*)"\s*\)"#).unwrap();
    static ref WARP_METHOD: Regex =
        Regex::new(r"warp::(get|post|put|patch|delete|head|options)\(\)").unwrap();
    static ref WARP_HANDLER: Regex = Regex::new(r"\.(?:and_then|map)\(\s*([\w:]+)\s*\)").unwrap();

    static ref STRUCT: Regex = Regex::new(
        r"(?m)^\s*(?:pub(?:\([^)]*\))?\s+)?struct\s+(\w+)(?:<[^>{]*>)?\s*(?:where[^{;]*)?\{"
    )
    .unwrap();
    static ref STRUCT_FIELD: Regex =
        Regex::new(r"^(?:pub(?:\([^)]*\))?\s+)?(\w+)\s*:\s*(.+?),?$").unwrap();
    static ref INHERENT_IMPL: Regex = Regex::new(
        r"(?m)^\s*impl(?:<[^>]*>)?\s+([\w:]+?)(?:<[^>{]*>)?\s*(?:where[^{]*)?\{"
    )
    .unwrap();
    static ref FN_DECL: Regex = Regex::new(
        r"(?m)^\s*(?:pub(?:\([^)]*\))?\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?fn\s+(\w+)"
    )
    .unwrap();
}

/// `#[get("/p")]` handler attributes (actix-web and rocket).
pub(crate) fn attribute_routes(rel: &str, content: &str) -> Vec<Route> {
    let mut found: Vec<(usize, Route)> = Vec::new();

    for caps in VERB_ATTR.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        let handler = NEXT_FN.captures(&content[whole.end()..]).map(|c| c[1].to_string());
        found.push((whole.start(), Route::new(&caps[1], normalize_route(&caps[2]), handler, rel)));
    }

    for caps in ROUTE_ATTR.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        let handler = NEXT_FN.captures(&content[whole.end()..]).map(|c| c[1].to_string());
        let mut methods: Vec<String> = ATTR_METHOD.captures_iter(&caps[2]).map(|m| m[1].to_string()).collect();
        if methods.is_empty() {
            methods.push("ANY".to_string());
        }
        for method in methods {
            found.push((
                whole.start(),
                Route::new(&method, normalize_route(&caps[1]), handler.clone(), rel),
            ));
        }
    }

    found.sort_by_key(|(at, _)| *at);
    found.into_iter().map(|(_, r)| r).collect()
}

/// actix-web attribute routes plus `.route()` / `web::resource()` builders.
pub fn actix_routes(ws: &Workspace) -> Vec<Route> {
    ws.scan(RS_GLOBS, |rel, content| {
        let mut routes = attribute_routes(rel, content);
        routes.extend(actix_builder_routes(rel, content));
        routes
    })
}

/// Rocket attribute routes.
pub fn rocket_routes(ws: &Workspace) -> Vec<Route> {
    ws.scan(RS_GLOBS, attribute_routes)
}

pub(crate) fn actix_builder_routes(rel: &str, content: &str) -> Vec<Route> {
    let mut found: Vec<(usize, Route)> = Vec::new();

    for caps in ACTIX_ROUTE.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        found.push((
            whole.start(),
            Route::new(&caps[2], normalize_route(&caps[1]), Some(caps[3].to_string()), rel),
        ));
    }

    for caps in ACTIX_RESOURCE.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        let path = normalize_route(&caps[1]);
        let mut at = whole.end();
        while let Some(chained) = CHAINED_TO.captures(&content[at..]) {
            let Some(step) = chained.get(0) else { break };
            let (method, handler) = match (chained.get(1), chained.get(2), chained.get(3)) {
                (Some(m), Some(h), _) => (m.as_str(), h.as_str()),
                (_, _, Some(h)) => ("ANY", h.as_str()),
                _ => break,
            };
            found.push((at, Route::new(method, path.clone(), Some(handler.to_string()), rel)));
            at += step.end();
        }
    }

    found.sort_by_key(|(at, _)| *at);
    found.into_iter().map(|(_, r)| r).collect()
}

/// axum `Router::route` calls.
pub fn axum_routes(ws: &Workspace) -> Vec<Route> {
    ws.scan(RS_GLOBS, router_routes)
}

pub(crate) fn router_routes(rel: &str, content: &str) -> Vec<Route> {
    let mut routes = Vec::new();
    for caps in AXUM_ROUTE.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        let open = whole.start() + ".route".len();
        let Some(args) = paren_body(content, open) else { continue };
        let Some((_, methods)) = args.split_once(',') else { continue };
        let path = normalize_route(&caps[1]);
        for m in AXUM_METHOD.captures_iter(methods) {
            let method = if &m[1] == "any" { "ANY" } else { &m[1] };
            let handler = m.get(2).map(|h| h.as_str().to_string());
            routes.push(Route::new(method, path.clone(), handler, rel));
        }
    }
    routes
}

/// warp filter chains built from `warp::path!`.
pub fn warp_routes(ws: &Workspace) -> Vec<Route> {
    ws.scan(RS_GLOBS, filter_routes)
}

pub(crate) fn filter_routes(rel: &str, content: &str) -> Vec<Route> {
    let mut found: Vec<(usize, Route)> = Vec::new();

    let mut push = |at: usize, path: String| {
        let statement_end = content[at..].find(';').map(|p| at + p).unwrap_or(content.len());
        let statement_start = content[..at].rfind(';').map(|p| p + 1).unwrap_or(0);
        let statement = &content[statement_start..statement_end];
        let method = WARP_METHOD
            .captures(statement)
            .map(|m| m[1].to_string())
            .unwrap_or_else(|| "ANY".to_string());
        let handler = WARP_HANDLER.captures(statement).map(|h| h[1].to_string());
        found.push((at, Route::new(&method, path, handler, rel)));
    };

    for caps in WARP_PATH_MACRO.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        let mut params = 0;
        let segments: Vec<String> = caps[1]
            .split('/')
            .map(str::trim)
            .filter(|s| !s.is_empty() && *s != "..")
            .map(|s| {
                if s.starts_with('"') {
                    s.trim_matches('"').to_string()
                } else {
                    params += 1;
                    if params == 1 {
                        ":param".to_string()
                    } else {
                        format!(":param{}", params)
                    }
                }
            })
            .collect();
        push(whole.start(), normalize_route(&segments.join("/")));
    }

    for caps in WARP_PATH_FN.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        push(whole.start(), normalize_route(&caps[1]));
    }

    found.sort_by_key(|(at, _)| *at);
    found.into_iter().map(|(_, r)| r).collect()
}

/// Structs with named fields.
pub fn rust_models(ws: &Workspace) -> Vec<Model> {
    ws.scan(RS_GLOBS, struct_models)
}

pub(crate) fn struct_models(rel: &str, content: &str) -> Vec<Model> {
    STRUCT
        .captures_iter(content)
        .filter_map(|caps| {
            let body = brace_body(content, caps.get(0)?.end() - 1)?;
            let fields = body
                .lines()
                .map(str::trim)
                .filter(|l| !l.starts_with("#[") && !l.starts_with("//"))
                .filter_map(|l| STRUCT_FIELD.captures(l))
                .map(|c| Field::new(&c[1], c[2].trim()))
                .take(MAX_FIELDS)
                .collect();
            Model::new(&caps[1], fields, rel).non_empty()
        })
        .collect()
}

/// Inherent `impl` blocks of `*Service`, `*Repository`, `*Manager` and
/// `*Store` types, or any inherent impl inside a `*service*.rs` file.
pub fn rust_services(ws: &Workspace) -> Vec<Service> {
    ws.scan(RS_GLOBS, impl_services)
}

pub(crate) fn impl_services(rel: &str, content: &str) -> Vec<Service> {
    let service_file = rel
        .rsplit('/')
        .next()
        .map(|name| name.contains("service"))
        .unwrap_or(false);

    let mut units: Vec<(String, Vec<String>)> = Vec::new();
    for caps in INHERENT_IMPL.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        let ty = caps[1].rsplit("::").next().unwrap_or(&caps[1]).to_string();
        let service_type = ["Service", "Repository", "Manager", "Store"]
            .iter()
            .any(|suffix| ty.ends_with(suffix));
        if !(service_type || service_file) {
            continue;
        }
        let Some(body) = brace_body(content, whole.end() - 1) else { continue };
        let functions: Vec<String> = FN_DECL.captures_iter(body).map(|c| c[1].to_string()).collect();
        match units.iter_mut().find(|(name, _)| *name == ty) {
            Some((_, existing)) => existing.extend(functions),
            None => units.push((ty, functions)),
        }
    }

    units
        .into_iter()
        .filter_map(|(ty, functions)| Service::with_functions(ty, action_names(functions), rel))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_routes() {
        let src = r#"
#[get("/users/{id}")]
async fn get_user(path: web::Path<u32>) -> impl Responder { "" }

#[post("/users")]
pub async fn create_user() -> HttpResponse { todo!() }

#[rocket::get("/hello/<name>")]
fn hello(name: &str) -> String { name.into() }

#[route("/multi", method = "GET", method = "HEAD")]
async fn multi() -> HttpResponse { todo!() }
"#;
        let routes = attribute_routes("src/main.rs", src);
        let summary: Vec<(&str, &str, Option<&str>)> = routes
            .iter()
            .map(|r| (r.method.as_str(), r.path.as_str(), r.handler.as_deref()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("GET", "/users/:id", Some("get_user")),
                ("POST", "/users", Some("create_user")),
                ("GET", "/hello/:name", Some("hello")),
                ("GET", "/multi", Some("multi")),
                ("HEAD", "/multi", Some("multi")),
            ]
        );
    }

    #[test]
    fn test_actix_builders() {
        let src = r#"
App::new()
    .route("/health", web::get().to(health))
    .service(web::resource("/items/{id}").route(web::get().to(get_item)).route(web::delete().to(delete_item)))
"#;
        let routes = actix_builder_routes("src/main.rs", src);
        assert_eq!(routes.len(), 3);
        assert_eq!(routes[0].path, "/health");
        assert_eq!(routes[1].path, "/items/:id");
        assert_eq!(routes[2].method, "DELETE");
        assert_eq!(routes[2].handler.as_deref(), Some("delete_item"));
    }

    #[test]
    fn test_axum_method_chains() {
        let src = r#"
let app = Router::new()
    .route("/", get(root))
    .route("/users/{id}", get(handlers::show).put(update).delete(destroy))
    .route("/ws/:room", any(ws_handler));
"#;
        let routes = router_routes("src/app.rs", src);
        let summary: Vec<(&str, &str)> = routes.iter().map(|r| (r.method.as_str(), r.path.as_str())).collect();
        assert_eq!(
            summary,
            vec![
                ("GET", "/"),
                ("GET", "/users/:id"),
                ("PUT", "/users/:id"),
                ("DELETE", "/users/:id"),
                ("ANY", "/ws/:room"),
            ]
        );
        assert_eq!(routes[1].handler.as_deref(), Some("handlers::show"));
    }

    #[test]
    fn test_warp_filters() {
        let src = r#"
let hello = warp::path!("hello" / String)
    .and(warp::get())
    .map(greet);
let any = warp::path!("a" / u32 / "b" / String).and_then(handle);
"#;
        let routes = filter_routes("src/main.rs", src);
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].method, "GET");
        assert_eq!(routes[0].path, "/hello/:param");
        assert_eq!(routes[0].handler.as_deref(), Some("greet"));
        assert_eq!(routes[1].method, "ANY");
        assert_eq!(routes[1].path, "/a/:param/b/:param2");
    }

    #[test]
    fn test_struct_fields() {
        let src = r#"
#[derive(Debug, Serialize)]
pub struct User {
    /// Primary key.
    pub id: i64,
    #[serde(rename = "mail")]
    pub(crate) email: String,
    roles: HashMap<String, Vec<Role>>,
}

pub struct Marker;
struct Wrapper(u32);
"#;
        let models = struct_models("src/models.rs", src);
        assert_eq!(models.len(), 1);
        assert_eq!(
            models[0].fields,
            vec![
                Field::new("id", "i64"),
                Field::new("email", "String"),
                Field::new("roles", "HashMap<String, Vec<Role>>"),
            ]
        );
    }

    #[test]
    fn test_impl_services_with_brace_char_literal() {
        let src = "impl UserService {\n    pub fn open(&self) -> char { '{' }\n    pub fn find(&self) {}\n    pub fn save(&self) {}\n}\n";
        let services = impl_services("src/user_service.rs", src);
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].functions, vec!["open", "find", "save"]);
    }

    #[test]
    fn test_impl_services() {
        let src = r#"
impl UserService {
    pub fn new(repo: Repo) -> Self { Self { repo } }
    pub async fn register(&self) {}
    fn hash(&self) {}
}

impl Display for UserService {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result { Ok(()) }
}

impl<T: Clone> CacheStore<T> {
    pub fn get(&self) -> Option<T> { None }
}

impl Helper {
    pub fn help() {}
}

impl UserService {
    pub fn delete(&self) {}
}
"#;
        let services = impl_services("src/users.rs", src);
        let summary: Vec<(&str, Vec<&str>)> = services
            .iter()
            .map(|s| (s.name.as_str(), s.functions.iter().map(String::as_str).collect()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("UserService", vec!["register", "hash", "delete"]),
                ("CacheStore", vec!["get"]),
            ]
        );
    }
}
