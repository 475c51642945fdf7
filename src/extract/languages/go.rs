//! Go extractors: gin, echo, fiber, gorilla/mux, chi and net/http routes,
//! structs, handler types and services.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

use crate::extract::text::{
    action_names, brace_body, join_route, normalize_route, paren_body, split_top_level, MAX_FIELDS,
};
use crate::extract::{Controller, Field, Model, Route, Service, Workspace};

const GO_GLOBS: &[&str] = &["**/*.go"];
const SERVICE_GLOBS: &[&str] = &["**/*service*.go", "**/services/**/*.go"];

lazy_static! {
    static ref GROUP: Regex = Regex::new(
        r#"\b(\w+)\s*:?=\s*(\w+)\.(?:Group|PathPrefix)\(\s*"([^"]*)""#
    )
    .unwrap();
    static ref VERB_CALL: Regex = Regex::new(
        r#"\b(\w+)\.(GET|POST|PUT|PATCH|DELETE|OPTIONS|HEAD|Any|Get|Post|Put|Patch|Delete|Options|Head|All)\(\s*"([^"]*)""#
    )
    .unwrap();
    static ref HANDLE_FUNC: Regex =
        Regex::new(r#"\b(\w+)\.(?:HandleFunc|Handle)\(\s*"([^"]*)""#).unwrap();
    static ref METHODS_CHAIN: Regex = Regex::new(r"^\s*\.Methods\(([^)]*)\)").unwrap();
    static ref QUOTED: Regex = Regex::new(r#""(\w+)""#).unwrap();
    static ref PLAIN_IDENT: Regex = Regex::new(r"^&?[A-Za-z_]\w*(?:\.[A-Za-z_]\w*)*$").unwrap();

    static ref STRUCT: Regex = Regex::new(r"(?m)^\s*type\s+(\w+)\s+struct\s*\{").unwrap();
    static ref STRUCT_FIELD: Regex =
        Regex::new(r"^\s*([A-Za-z_]\w*(?:\s*,\s*[A-Za-z_]\w*)*)\s+([^\s`/]+)").unwrap();

    static ref RECEIVER_METHOD: Regex =
        Regex::new(r"(?m)^func\s*\(\s*(?:\w+\s+)?\*?(\w+)\s*\)\s*(\w+)\s*\(").unwrap();
}

/// Routes of every Go router flavour; the framework only changes which
/// receiver methods appear in practice.
pub fn go_routes(ws: &Workspace) -> Vec<Route> {
    ws.scan(GO_GLOBS, |rel, content| {
        if rel.ends_with("_test.go") {
            return Vec::new();
        }
        router_calls(rel, content)
    })
}

pub(crate) fn router_calls(rel: &str, content: &str) -> Vec<Route> {
    // group variable -> full prefix, resolved in declaration order
    let mut prefixes: HashMap<String, String> = HashMap::new();
    for caps in GROUP.captures_iter(content) {
        let parent = prefixes.get(&caps[2]).cloned().unwrap_or_default();
        prefixes.insert(caps[1].to_string(), join_route(&parent, &caps[3]));
    }
    let prefixed = |receiver: &str, path: &str| match prefixes.get(receiver) {
        Some(prefix) => join_route(prefix, path),
        None => normalize_route(path),
    };

    let mut found: Vec<(usize, Route)> = Vec::new();

    for caps in VERB_CALL.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        let receiver = &caps[1];
        let path = &caps[3];
        if matches!(receiver, "http" | "client" | "c" | "ctx") || !(path.is_empty() || path.starts_with('/')) {
            continue;
        }
        let method = match &caps[2] {
            "Any" | "All" => "ANY".to_string(),
            verb => verb.to_uppercase(),
        };
        let open = whole.start() + receiver.len() + caps[2].len() + 1;
        let handler = paren_body(content, open).and_then(last_identifier_arg);
        found.push((whole.start(), Route::new(&method, prefixed(receiver, path), handler, rel)));
    }

    for caps in HANDLE_FUNC.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        let receiver = &caps[1];
        let open = whole.start() + content[whole.start()..].find('(').unwrap_or(0);
        let Some(args) = paren_body(content, open) else { continue };
        let handler = last_identifier_arg(args);

        // Go 1.22 patterns carry the method: "GET /users/{id}"
        let (pattern_method, path) = match caps[2].split_once(' ') {
            Some((m, p)) if !m.is_empty() && m.chars().all(|c| c.is_ascii_uppercase()) => {
                (Some(m.to_string()), p.trim().to_string())
            }
            _ => (None, caps[2].to_string()),
        };

        let after = open + args.len() + 2;
        let chain = METHODS_CHAIN.captures(content.get(after..).unwrap_or(""));
        let methods: Vec<String> = match (pattern_method, chain) {
            (Some(m), _) => vec![m],
            (None, Some(chain)) => QUOTED
                .captures_iter(&chain[1])
                .map(|q| q[1].to_string())
                .collect(),
            (None, None) => vec!["ANY".to_string()],
        };
        let path = prefixed(receiver, &path);
        for method in methods {
            found.push((whole.start(), Route::new(&method, path.clone(), handler.clone(), rel)));
        }
    }

    found.sort_by_key(|(at, _)| *at);
    found.into_iter().map(|(_, r)| r).collect()
}

fn last_identifier_arg(args: &str) -> Option<String> {
    split_top_level(args, &[','])
        .into_iter()
        .skip(1)
        .filter(|a| PLAIN_IDENT.is_match(a))
        .last()
        .map(|a| a.trim_start_matches('&').to_string())
}

/// `type X struct { ... }` declarations with at least one named field.
pub fn go_models(ws: &Workspace) -> Vec<Model> {
    ws.scan(GO_GLOBS, |rel, content| {
        if rel.ends_with("_test.go") {
            return Vec::new();
        }
        struct_models(rel, content)
    })
}

pub(crate) fn struct_models(rel: &str, content: &str) -> Vec<Model> {
    STRUCT
        .captures_iter(content)
        .filter_map(|caps| {
            let body = brace_body(content, caps.get(0)?.end() - 1)?;
            Model::new(&caps[1], struct_fields(body), rel).non_empty()
        })
        .collect()
}

fn struct_fields(body: &str) -> Vec<Field> {
    let mut fields = Vec::new();
    let mut nested = 0i32;

    for line in body.lines() {
        let depth_before = nested;
        nested += line.matches('{').count() as i32 - line.matches('}').count() as i32;
        if depth_before > 0 {
            continue;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }
        let Some(caps) = STRUCT_FIELD.captures(trimmed) else {
            // embedded type: a single token
            continue;
        };
        let ty = if caps[2].starts_with("struct") { "struct" } else { &caps[2] };
        for name in caps[1].split(',') {
            fields.push(Field::new(name.trim(), ty));
        }
        if fields.len() >= MAX_FIELDS {
            fields.truncate(MAX_FIELDS);
            break;
        }
    }
    fields
}

/// Methods on `*XHandler` / `*XController` receivers.
pub fn handler_controllers(ws: &Workspace) -> Vec<Controller> {
    ws.scan(GO_GLOBS, |rel, content| {
        receiver_groups(content, |ty| ty.ends_with("Handler") || ty.ends_with("Controller"))
            .into_iter()
            .filter_map(|(ty, methods)| Controller::with_actions(ty, methods, rel))
            .collect()
    })
}

/// Exported methods of types declared in service files.
pub fn go_services(ws: &Workspace) -> Vec<Service> {
    ws.scan(SERVICE_GLOBS, |rel, content| {
        if rel.ends_with("_test.go") {
            return Vec::new();
        }
        receiver_groups(content, |_| true)
            .into_iter()
            .filter_map(|(ty, methods)| Service::with_functions(ty, methods, rel))
            .collect()
    })
}

/// Exported receiver methods grouped by receiver type, in order of first
/// appearance.
pub(crate) fn receiver_groups<F>(content: &str, accept: F) -> Vec<(String, Vec<String>)>
where
    F: Fn(&str) -> bool,
{
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    for caps in RECEIVER_METHOD.captures_iter(content) {
        let (ty, method) = (&caps[1], &caps[2]);
        if !accept(ty) || !method.starts_with(|c: char| c.is_ascii_uppercase()) {
            continue;
        }
        match groups.iter_mut().find(|(name, _)| name == ty) {
            Some((_, methods)) => methods.push(method.to_string()),
            None => groups.push((ty.to_string(), vec![method.to_string()])),
        }
    }
    groups
        .into_iter()
        .map(|(ty, methods)| (ty, action_names(methods)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gin_groups() {
        let src = r#"
func main() {
	r := gin.Default()
	r.GET("/health", health)
	api := r.Group("/api")
	v1 := api.Group("/v1")
	v1.POST("/users", h.CreateUser)
	v1.GET("/users/:id", func(c *gin.Context) {
		c.JSON(200, nil)
	})
	r.Any("/proxy/*path", proxy)
}
"#;
        let routes = router_calls("main.go", src);
        let summary: Vec<(&str, &str, Option<&str>)> = routes
            .iter()
            .map(|r| (r.method.as_str(), r.path.as_str(), r.handler.as_deref()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("GET", "/health", Some("health")),
                ("POST", "/api/v1/users", Some("h.CreateUser")),
                ("GET", "/api/v1/users/:id", None),
                ("ANY", "/proxy/*path", Some("proxy")),
            ]
        );
    }

    #[test]
    fn test_fiber_and_echo_verbs() {
        let src = "app.Get(\"/items/:id\", getItem)\ne.DELETE(\"/items/:id\", h.Delete)\n";
        let routes = router_calls("server.go", src);
        assert_eq!(routes[0].method, "GET");
        assert_eq!(routes[1].method, "DELETE");
        assert_eq!(routes[1].handler.as_deref(), Some("h.Delete"));
    }

    #[test]
    fn test_gorilla_and_net_http() {
        let src = r#"
r := mux.NewRouter()
s := r.PathPrefix("/api").Subrouter()
s.HandleFunc("/users/{id:[0-9]+}", getUser).Methods("GET", "HEAD")
http.HandleFunc("/ping", ping)
mux.HandleFunc("POST /orders/{id}", createOrder)
"#;
        let routes = router_calls("routes.go", src);
        let summary: Vec<(&str, &str)> = routes
            .iter()
            .map(|r| (r.method.as_str(), r.path.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("GET", "/api/users/:id"),
                ("HEAD", "/api/users/:id"),
                ("ANY", "/ping"),
                ("POST", "/orders/:id"),
            ]
        );
        assert_eq!(routes[2].handler.as_deref(), Some("ping"));
    }

    #[test]
    fn test_struct_fields() {
        let src = r#"
type User struct {
	gorm.Model
	ID        uint   `gorm:"primaryKey"`
	Name, Nick string
	// Email is unique
	Email     *string `json:"email"`
	Address   struct {
		City string
	}
	Tags      []string
}

type Empty struct {
	Base
}
"#;
        let models = struct_models("models/user.go", src);
        assert_eq!(models.len(), 1);
        let fields: Vec<(&str, &str)> = models[0]
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.ty.as_str()))
            .collect();
        assert_eq!(
            fields,
            vec![
                ("ID", "uint"),
                ("Name", "string"),
                ("Nick", "string"),
                ("Email", "*string"),
                ("Address", "struct"),
                ("Tags", "[]string"),
            ]
        );
    }

    #[test]
    fn test_receiver_groups() {
        let src = r#"
func (h *UserHandler) List(c *gin.Context) {}
func (s *UserService) Create(u User) error { return nil }
func (h *UserHandler) Show(c *gin.Context) {}
func (h *UserHandler) bind(c *gin.Context) {}
func NewUserHandler() *UserHandler { return nil }
"#;
        let handlers = receiver_groups(src, |ty| ty.ends_with("Handler"));
        assert_eq!(handlers, vec![("UserHandler".to_string(), vec!["List".to_string(), "Show".to_string()])]);
        let all = receiver_groups(src, |_| true);
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].0, "UserService");
    }
}
