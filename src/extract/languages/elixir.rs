//! Elixir extractors: Phoenix routers, Plug routers, Ecto schemas,
//! Phoenix controllers, function components and context modules.

use lazy_static::lazy_static;
use regex::Regex;

use crate::extract::text::{
    action_names, closes_block, end_body, join_route, opens_block, pascal_case, rest_actions,
    singularize, EndSyntax, RestStyle, MAX_FIELDS,
};
use crate::extract::{Component, Controller, Field, Model, Route, Service, Workspace};

const ROUTER_GLOBS: &[&str] = &["**/router.ex", "**/*_router.ex"];
const SOURCE_GLOBS: &[&str] = &["lib/**/*.ex"];
const CONTROLLER_GLOBS: &[&str] = &["lib/**/controllers/**/*.ex", "lib/**/*_controller.ex"];
const WEB_GLOBS: &[&str] = &["lib/**/*_web/**/*.ex", "lib/**/components/**/*.ex", "lib/**/live/**/*.ex"];

lazy_static! {
    static ref DEFMODULE: Regex = Regex::new(r"(?m)^\s*defmodule\s+([\w.]+)\s+do").unwrap();
    static ref SCOPE: Regex = Regex::new(r#"^\s*scope\b(?:\s+"([^"]*)")?"#).unwrap();
    static ref VERB_ROUTE: Regex = Regex::new(
        r#"^\s*(get|post|put|patch|delete|options|head|match|forward)\s+(?::\w+\s*,\s*)?"([^"]+)"(?:\s*,\s*([A-Z][\w.]*)(?:\s*,\s*:(\w+))?)?"#
    )
    .unwrap();
    static ref LIVE_ROUTE: Regex =
        Regex::new(r#"^\s*live\s+"([^"]+)"\s*,\s*([A-Z][\w.]*)(?:\s*,\s*:(\w+))?"#).unwrap();
    static ref RESOURCES: Regex =
        Regex::new(r#"^\s*resources\s+"([^"]+)"\s*,\s*([A-Z][\w.]*)(.*)$"#).unwrap();
    static ref ATOM_LIST: Regex = Regex::new(r"(only|except):\s*\[([^\]]*)\]").unwrap();
    static ref SCHEMA: Regex =
        Regex::new(r#"(?m)^\s*(?:schema\s+"(\w+)"|embedded_schema)\s+do"#).unwrap();
    static ref FIELD: Regex =
        Regex::new(r"^\s*field\s+:(\w+)(?:\s*,\s*(\{[^}]*\}|[:\w.]+))?").unwrap();
    static ref ASSOC: Regex = Regex::new(
        r"^\s*(belongs_to|has_many|has_one|many_to_many|embeds_one|embeds_many)\s+:(\w+)\s*,\s*([\w.]+)"
    )
    .unwrap();
    static ref TIMESTAMPS: Regex = Regex::new(r"^\s*timestamps\(").unwrap();
    static ref CONN_ACTION: Regex = Regex::new(r"(?m)^\s*def\s+(\w+)\(\s*conn\b").unwrap();
    static ref PUBLIC_DEF: Regex = Regex::new(r"(?m)^\s*def\s+(\w+[?!]?)").unwrap();
    static ref ATTR: Regex = Regex::new(r"^\s*(?:attr|slot)\s+:(\w+)").unwrap();
    static ref ASSIGNS_DEF: Regex = Regex::new(r"^\s*def\s+(\w+)\(\s*assigns\s*\)").unwrap();
    static ref LIVE_VIEW: Regex = Regex::new(
        r"(?m)^\s*use\s+(?:Phoenix\.LiveView|Phoenix\.LiveComponent|[\w.]+,\s*:live_(?:view|component))\b"
    )
    .unwrap();
}

/// Phoenix router routes.
pub fn phoenix_routes(ws: &Workspace) -> Vec<Route> {
    ws.scan(ROUTER_GLOBS, router_routes)
}

/// Plug.Router routes anywhere under `lib/`.
pub fn plug_routes(ws: &Workspace) -> Vec<Route> {
    ws.scan(SOURCE_GLOBS, router_routes)
}

/// Routes declared in one router file, with `scope` prefixes applied.
pub(crate) fn router_routes(rel: &str, content: &str) -> Vec<Route> {
    let mut routes = Vec::new();
    // (prefix, depth at which the scope's block was opened)
    let mut scopes: Vec<(String, usize)> = Vec::new();
    let mut depth = 0usize;

    for line in content.lines() {
        let code = line.split('#').next().unwrap_or("");
        let prefix = scopes.last().map(|(p, _)| p.clone()).unwrap_or_default();

        if closes_block(code) {
            depth = depth.saturating_sub(1);
            if scopes.last().map(|(_, d)| *d == depth).unwrap_or(false) {
                scopes.pop();
            }
            continue;
        }

        let opens = opens_block(code, EndSyntax::Elixir);

        if let Some(caps) = SCOPE.captures(code) {
            if opens {
                let path = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                scopes.push((join_route(&prefix, path), depth));
            }
        } else if let Some(caps) = LIVE_ROUTE.captures(code) {
            let handler = match caps.get(3) {
                Some(action) => format!("{}.{}", &caps[2], action.as_str()),
                None => caps[2].to_string(),
            };
            routes.push(Route::new("GET", join_route(&prefix, &caps[1]), Some(handler), rel));
        } else if let Some(caps) = RESOURCES.captures(code) {
            let base = join_route(&prefix, &caps[1]);
            let controller = &caps[2];
            let (only, except) = atom_filters(&caps[3]);
            for (action, method, suffix) in rest_actions(RestStyle::Phoenix) {
                let keep = only.as_ref().map(|o| o.iter().any(|a| a.as_str() == *action)).unwrap_or(true)
                    && !except.iter().any(|a| a.as_str() == *action);
                if keep {
                    routes.push(Route::new(
                        method,
                        format!("{}{}", base, suffix),
                        Some(format!("{}.{}", controller, action)),
                        rel,
                    ));
                }
            }
            if opens {
                let singular =
                    singularize(caps[1].trim_matches('/').rsplit('/').next().unwrap_or(""));
                scopes.push((format!("{}/:{}_id", base, singular), depth));
            }
        } else if let Some(caps) = VERB_ROUTE.captures(code) {
            let verb = &caps[1];
            let method = match verb {
                "match" | "forward" => "ANY",
                other => other,
            };
            let handler = match (caps.get(3), caps.get(4)) {
                (Some(ctrl), Some(action)) => Some(format!("{}.{}", ctrl.as_str(), action.as_str())),
                (Some(ctrl), None) => Some(ctrl.as_str().to_string()),
                _ => None,
            };
            routes.push(Route::new(method, join_route(&prefix, &caps[2]), handler, rel));
        }

        if opens {
            depth += 1;
        }
    }

    routes
}

/// `only:` and `except:` atom lists of a resources declaration.
fn atom_filters(options: &str) -> (Option<Vec<String>>, Vec<String>) {
    let mut only = None;
    let mut except = Vec::new();
    for caps in ATOM_LIST.captures_iter(options) {
        let atoms: Vec<String> = caps[2]
            .split(',')
            .map(|a| a.trim().trim_start_matches(':').to_string())
            .filter(|a| !a.is_empty())
            .collect();
        if &caps[1] == "only" {
            only = Some(atoms);
        } else {
            except = atoms;
        }
    }
    (only, except)
}

/// Ecto schemas.
pub fn ecto_models(ws: &Workspace) -> Vec<Model> {
    ws.scan(SOURCE_GLOBS, schema_models)
}

pub(crate) fn schema_models(rel: &str, content: &str) -> Vec<Model> {
    SCHEMA
        .captures_iter(content)
        .filter_map(|caps| {
            let at = caps.get(0)?.start();
            let name = enclosing_module(content, at)
                .map(|m| short_name(&m).to_string())
                .or_else(|| caps.get(1).map(|t| pascal_case(&singularize(t.as_str()))))?;
            let body = end_body(content, at, EndSyntax::Elixir);
            Model::new(name, schema_fields(body), rel).non_empty()
        })
        .collect()
}

fn schema_fields(body: &str) -> Vec<Field> {
    let mut fields = Vec::new();
    for line in body.lines() {
        if let Some(caps) = FIELD.captures(line) {
            let ty = caps
                .get(2)
                .map(|t| t.as_str().trim_start_matches(':').to_string())
                .unwrap_or_else(|| "string".to_string());
            fields.push(Field::new(&caps[1], ty));
        } else if let Some(caps) = ASSOC.captures(line) {
            fields.push(Field::new(&caps[2], format!("{} {}", &caps[1], short_name(&caps[3]))));
        } else if TIMESTAMPS.is_match(line) {
            fields.push(Field::new("inserted_at", "naive_datetime"));
            fields.push(Field::new("updated_at", "naive_datetime"));
        }
        if fields.len() >= MAX_FIELDS {
            fields.truncate(MAX_FIELDS);
            break;
        }
    }
    fields
}

/// Phoenix controllers.
pub fn phoenix_controllers(ws: &Workspace) -> Vec<Controller> {
    ws.scan(CONTROLLER_GLOBS, controller_modules)
}

pub(crate) fn controller_modules(rel: &str, content: &str) -> Vec<Controller> {
    module_sections(content)
        .into_iter()
        .filter(|(name, _)| name.ends_with("Controller"))
        .filter_map(|(name, body)| {
            let actions = action_names(CONN_ACTION.captures_iter(body).map(|c| c[1].to_string()));
            Controller::with_actions(short_name(&name), actions, rel)
        })
        .collect()
}

/// Phoenix function components and LiveView modules.
pub fn phoenix_components(ws: &Workspace) -> Vec<Component> {
    ws.scan(WEB_GLOBS, function_components)
}

pub(crate) fn function_components(rel: &str, content: &str) -> Vec<Component> {
    let mut components = Vec::new();

    for (module, body) in module_sections(content) {
        if LIVE_VIEW.is_match(body) {
            components.push(Component::new(short_name(&module), Vec::new(), rel));
            continue;
        }

        let mut pending: Vec<String> = Vec::new();
        for line in body.lines() {
            if let Some(caps) = ATTR.captures(line) {
                pending.push(caps[1].to_string());
            } else if let Some(caps) = ASSIGNS_DEF.captures(line) {
                let name = caps[1].to_string();
                if name != "render" || !pending.is_empty() {
                    components.push(Component::new(name, std::mem::take(&mut pending), rel));
                }
                pending.clear();
            }
        }
    }

    components
}

/// Context modules: public functions of non-web modules under `lib/`.
pub fn context_services(ws: &Workspace) -> Vec<Service> {
    ws.scan(SOURCE_GLOBS, |rel, content| {
        if is_web_or_infra_file(rel, content) {
            return Vec::new();
        }
        context_modules(rel, content)
    })
}

pub(crate) fn context_modules(rel: &str, content: &str) -> Vec<Service> {
    module_sections(content)
        .into_iter()
        .filter_map(|(name, body)| {
            let functions = action_names(PUBLIC_DEF.captures_iter(body).map(|c| c[1].to_string()));
            Service::with_functions(name, functions, rel)
        })
        .collect()
}

fn is_web_or_infra_file(rel: &str, content: &str) -> bool {
    const SKIP_SUFFIXES: &[&str] = &[
        "_controller.ex",
        "router.ex",
        "application.ex",
        "repo.ex",
        "endpoint.ex",
        "telemetry.ex",
        "_view.ex",
        "_html.ex",
        "_json.ex",
        "_live.ex",
        "_component.ex",
        "components.ex",
    ];
    rel.split('/').any(|seg| seg.ends_with("_web") || seg == "mix")
        || SKIP_SUFFIXES.iter().any(|s| rel.ends_with(s))
        || content.contains("use Ecto.Schema")
        || content.contains("use Ecto.Migration")
}

/// `(module name, module text)` for every `defmodule` in a file.
fn module_sections(content: &str) -> Vec<(String, &str)> {
    let starts: Vec<(usize, String)> = DEFMODULE
        .captures_iter(content)
        .filter_map(|c| Some((c.get(0)?.start(), c[1].to_string())))
        .collect();

    starts
        .iter()
        .enumerate()
        .map(|(i, (start, name))| {
            let end = starts.get(i + 1).map(|(s, _)| *s).unwrap_or(content.len());
            (name.clone(), &content[*start..end])
        })
        .collect()
}

/// Name of the last `defmodule` opened before `at`.
fn enclosing_module(content: &str, at: usize) -> Option<String> {
    DEFMODULE
        .captures_iter(&content[..at])
        .last()
        .map(|c| c[1].to_string())
}

/// `MyApp.Accounts.User` -> `User`.
fn short_name(module: &str) -> &str {
    module.rsplit('.').next().unwrap_or(module)
}
