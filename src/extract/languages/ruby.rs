//! Ruby extractors: Rails routes, schema and models, controllers,
//! ViewComponents, service objects, and Sinatra routes.

use lazy_static::lazy_static;
use regex::Regex;

use crate::extract::text::{
    action_names, closes_block, dedup, end_body, identifier_list, join_route, opens_block, pascal_case,
    rest_actions, singularize, EndSyntax, RestStyle, MAX_FIELDS,
};
use crate::extract::{Component, Controller, Field, Model, Route, Service, Workspace};

const ROUTES_GLOBS: &[&str] = &["config/routes.rb", "config/routes/**/*.rb"];
const SCHEMA_GLOBS: &[&str] = &["db/schema.rb"];
const MODEL_GLOBS: &[&str] = &["app/models/**/*.rb"];
const CONTROLLER_GLOBS: &[&str] = &["app/controllers/**/*_controller.rb"];
const COMPONENT_GLOBS: &[&str] = &["app/components/**/*.rb"];
const SERVICE_GLOBS: &[&str] = &["app/services/**/*.rb", "lib/**/*service*.rb"];
const RUBY_GLOBS: &[&str] = &["**/*.rb"];

lazy_static! {
    static ref NAMESPACE: Regex = Regex::new(r#"^\s*namespace\s+[:'"]?(\w+)"#).unwrap();
    static ref SCOPE: Regex =
        Regex::new(r#"^\s*scope\b(?:\s+(?:path:\s*)?['"]([^'"]*)['"])?"#).unwrap();
    static ref RESOURCES: Regex = Regex::new(r#"^\s*(resources|resource)\s+[:'"]?(\w+)['"]?(.*)$"#).unwrap();
    static ref VERB: Regex = Regex::new(
        r#"^\s*(get|post|put|patch|delete|match)\s+['"]([^'"]+)['"](.*)$"#
    )
    .unwrap();
    static ref ROOT: Regex = Regex::new(r#"^\s*root\s+(?:to:\s*|:to\s*=>\s*)?['"]([\w/]+#\w+)['"]"#).unwrap();
    static ref TARGET: Regex = Regex::new(r#"(?:to:\s*|=>\s*)['"]([\w/]+#\w+)['"]"#).unwrap();
    static ref VIA: Regex = Regex::new(r"\bvia:\s*(?:\[([^\]]*)\]|%i\[([^\]]*)\]|:(\w+))").unwrap();
    static ref SYMBOL_LIST: Regex =
        Regex::new(r"(only|except):\s*(?:\[([^\]]*)\]|%i\[([^\]]*)\]|:(\w+))").unwrap();
    static ref SINATRA_ROUTE: Regex = Regex::new(
        r#"(?m)^\s*(get|post|put|patch|delete|options|head)\s+['"]([^'"]+)['"][^\n]*\bdo\b"#
    )
    .unwrap();

    static ref CREATE_TABLE: Regex = Regex::new(r#"(?m)^\s*create_table\s+["':](\w+)"#).unwrap();
    static ref COLUMN: Regex = Regex::new(r#"^\s*t\.(\w+)\s+["':](\w+)"#).unwrap();
    static ref TIMESTAMPS: Regex = Regex::new(r"^\s*t\.timestamps\b").unwrap();
    static ref AR_CLASS: Regex = Regex::new(
        r"(?m)^\s*class\s+((?:\w+::)*(\w+))\s*<\s*(?:ApplicationRecord|ActiveRecord::Base)\b"
    )
    .unwrap();
    static ref ASSOCIATION: Regex = Regex::new(
        r"(?m)^\s*(belongs_to|has_many|has_one|has_and_belongs_to_many)\s+:(\w+)"
    )
    .unwrap();

    static ref CONTROLLER_CLASS: Regex =
        Regex::new(r"(?m)^\s*class\s+((?:\w+::)*\w+Controller)\b").unwrap();
    static ref COMPONENT_CLASS: Regex = Regex::new(
        r"(?m)^\s*class\s+((?:\w+::)*\w+)\s*<\s*(?:ViewComponent::Base|ApplicationComponent|\w*Component)\b"
    )
    .unwrap();
    static ref INITIALIZE: Regex = Regex::new(r"def\s+initialize\s*\(([^)]*)\)").unwrap();
    static ref KEYWORD_ARG: Regex = Regex::new(r"(\w+):").unwrap();
    static ref CLASS_OR_MODULE: Regex =
        Regex::new(r"(?m)^\s*(?:class|module)\s+((?:\w+::)*\w+)").unwrap();
    static ref DEF: Regex = Regex::new(r"^\s*def\s+(self\.)?(\w+[?!=]?)").unwrap();
    static ref VISIBILITY: Regex = Regex::new(r"^\s*(private|protected)\s*$").unwrap();
}

/// Rails `config/routes.rb`.
pub fn rails_routes(ws: &Workspace) -> Vec<Route> {
    ws.scan(ROUTES_GLOBS, routes_file)
}

pub(crate) fn routes_file(rel: &str, content: &str) -> Vec<Route> {
    let mut routes = Vec::new();
    // (path prefix, controller namespace, depth at which the block opened)
    let mut scopes: Vec<(String, String, usize)> = Vec::new();
    let mut depth = 0usize;

    for line in content.lines() {
        let code = line.split('#').next().unwrap_or("");
        // `#` inside `'users#index'` is not a comment
        let code = if code.matches('\'').count() % 2 == 1 || code.matches('"').count() % 2 == 1 {
            line
        } else {
            code
        };
        let (prefix, namespace) = scopes
            .last()
            .map(|(p, n, _)| (p.clone(), n.clone()))
            .unwrap_or_default();

        if closes_block(code) {
            depth = depth.saturating_sub(1);
            if scopes.last().map(|(_, _, d)| *d == depth).unwrap_or(false) {
                scopes.pop();
            }
            continue;
        }

        let opens = opens_block(code, EndSyntax::Ruby);

        if let Some(caps) = NAMESPACE.captures(code) {
            if opens {
                let ns = if namespace.is_empty() {
                    caps[1].to_string()
                } else {
                    format!("{}/{}", namespace, &caps[1])
                };
                scopes.push((join_route(&prefix, &caps[1]), ns, depth));
            }
        } else if let Some(caps) = SCOPE.captures(code) {
            if opens {
                let path = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                scopes.push((join_route(&prefix, path), namespace.clone(), depth));
            }
        } else if let Some(caps) = ROOT.captures(code) {
            let handler = qualify(&namespace, &caps[1]);
            routes.push(Route::new("GET", join_route(&prefix, "/"), Some(handler), rel));
        } else if let Some(caps) = RESOURCES.captures(code) {
            let singular_resource = &caps[1] == "resource";
            let name = &caps[2];
            let base = join_route(&prefix, name);
            let controller_name = if singular_resource {
                format!("{}s", name)
            } else {
                name.to_string()
            };
            let controller = qualify(&namespace, &controller_name);
            let (only, except) = symbol_filters(&caps[3]);

            for (action, method, suffix) in rest_actions(RestStyle::Rails) {
                if singular_resource && *action == "index" {
                    continue;
                }
                let keep = only.as_ref().map(|o| o.iter().any(|a| a.as_str() == *action)).unwrap_or(true)
                    && !except.iter().any(|a| a.as_str() == *action);
                if !keep {
                    continue;
                }
                let suffix = if singular_resource {
                    suffix.trim_start_matches("/:id")
                } else {
                    *suffix
                };
                routes.push(Route::new(
                    method,
                    format!("{}{}", base, suffix),
                    Some(format!("{}#{}", controller, action)),
                    rel,
                ));
            }

            if opens {
                let nested = if singular_resource {
                    base.clone()
                } else {
                    format!("{}/:{}_id", base, singularize(name))
                };
                scopes.push((nested, namespace.clone(), depth));
            }
        } else if let Some(caps) = VERB.captures(code) {
            let rest = &caps[3];
            let path = join_route(&prefix, &caps[2]);
            let handler = TARGET.captures(rest).map(|t| qualify(&namespace, &t[1]));
            let methods = if &caps[1] == "match" {
                via_verbs(rest)
            } else {
                vec![caps[1].to_string()]
            };
            for method in methods {
                routes.push(Route::new(&method, path.clone(), handler.clone(), rel));
            }
        }

        if opens {
            depth += 1;
        }
    }

    routes
}

/// `users#index` inside `namespace :admin` becomes `admin/users#index`.
fn qualify(namespace: &str, target: &str) -> String {
    if namespace.is_empty() {
        target.to_string()
    } else {
        format!("{}/{}", namespace, target)
    }
}

/// Verbs named by a `match` line's `via:` option; `ANY` when absent or `:all`.
fn via_verbs(options: &str) -> Vec<String> {
    let Some(caps) = VIA.captures(options) else {
        return vec!["ANY".to_string()];
    };
    let raw = caps
        .get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map(|m| m.as_str())
        .unwrap_or("");
    let verbs = dedup(
        raw.split(|c: char| c == ',' || c.is_whitespace())
            .map(|s| s.trim().trim_start_matches(':').trim_matches(&['\'', '"'][..]))
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    );
    if verbs.is_empty() || verbs.iter().any(|v| v == "all") {
        vec!["ANY".to_string()]
    } else {
        verbs
    }
}

fn symbol_filters(options: &str) -> (Option<Vec<String>>, Vec<String>) {
    let mut only = None;
    let mut except = Vec::new();
    for caps in SYMBOL_LIST.captures_iter(options) {
        let raw = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| m.as_str())
            .unwrap_or("");
        let names: Vec<String> = raw
            .split(|c: char| c == ',' || c.is_whitespace())
            .map(|s| s.trim().trim_start_matches(':').to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if &caps[1] == "only" {
            only = Some(names);
        } else {
            except = names;
        }
    }
    (only, except)
}

/// Sinatra `get '/p' do` blocks.
pub fn sinatra_routes(ws: &Workspace) -> Vec<Route> {
    ws.scan(RUBY_GLOBS, block_routes)
}

pub(crate) fn block_routes(rel: &str, content: &str) -> Vec<Route> {
    if rel.starts_with("config/") {
        return Vec::new();
    }
    SINATRA_ROUTE
        .captures_iter(content)
        .map(|caps| Route::new(&caps[1], join_route("", &caps[2]), None, rel))
        .collect()
}

/// Tables from `db/schema.rb` merged with ActiveRecord classes.
///
/// Classes without a table are kept with their association fields only,
/// possibly none.
pub fn rails_models(ws: &Workspace) -> Vec<Model> {
    let mut models = ws.scan(SCHEMA_GLOBS, schema_tables);
    let classes = ws.scan(MODEL_GLOBS, record_classes);

    for class in classes {
        match models.iter_mut().find(|m| m.name == class.name) {
            Some(table) => {
                for field in class.fields {
                    if !table.fields.iter().any(|f| f.name == field.name) {
                        table.fields.push(field);
                    }
                }
            }
            None => models.push(class),
        }
    }
    models
}

pub(crate) fn schema_tables(rel: &str, content: &str) -> Vec<Model> {
    CREATE_TABLE
        .captures_iter(content)
        .filter_map(|caps| {
            let at = caps.get(0)?.start();
            let body = end_body(content, at, EndSyntax::Ruby);
            let mut fields = Vec::new();
            for line in body.lines() {
                if let Some(c) = COLUMN.captures(line) {
                    if &c[1] != "index" {
                        fields.push(Field::new(&c[2], &c[1]));
                    }
                } else if TIMESTAMPS.is_match(line) {
                    fields.push(Field::new("created_at", "datetime"));
                    fields.push(Field::new("updated_at", "datetime"));
                }
            }
            fields.truncate(MAX_FIELDS);
            Model::new(pascal_case(&singularize(&caps[1])), fields, rel).non_empty()
        })
        .collect()
}

pub(crate) fn record_classes(rel: &str, content: &str) -> Vec<Model> {
    AR_CLASS
        .captures_iter(content)
        .filter_map(|caps| {
            let at = caps.get(0)?.start();
            let body = end_body(content, at, EndSyntax::Ruby);
            let fields = ASSOCIATION
                .captures_iter(body)
                .map(|a| Field::new(&a[2], &a[1]))
                .take(MAX_FIELDS)
                .collect();
            Some(Model::new(&caps[2], fields, rel))
        })
        .collect()
}

/// Rails controllers.
pub fn rails_controllers(ws: &Workspace) -> Vec<Controller> {
    ws.scan(CONTROLLER_GLOBS, controller_classes)
}

pub(crate) fn controller_classes(rel: &str, content: &str) -> Vec<Controller> {
    CONTROLLER_CLASS
        .captures_iter(content)
        .filter_map(|caps| {
            let body = end_body(content, caps.get(0)?.start(), EndSyntax::Ruby);
            let actions = public_defs(body)
                .into_iter()
                .filter(|(class_method, _)| !class_method)
                .map(|(_, name)| name);
            Controller::with_actions(&caps[1], action_names(actions), rel)
        })
        .collect()
}

/// Public instance and class method names, stopping at `private`/`protected`.
fn public_defs(body: &str) -> Vec<(bool, String)> {
    let mut defs = Vec::new();
    for line in body.lines() {
        if VISIBILITY.is_match(line) {
            break;
        }
        if let Some(caps) = DEF.captures(line) {
            defs.push((caps.get(1).is_some(), caps[2].to_string()));
        }
    }
    defs
}

/// ViewComponent classes.
pub fn view_components(ws: &Workspace) -> Vec<Component> {
    ws.scan(COMPONENT_GLOBS, component_classes)
}

pub(crate) fn component_classes(rel: &str, content: &str) -> Vec<Component> {
    COMPONENT_CLASS
        .captures_iter(content)
        .filter_map(|caps| {
            let body = end_body(content, caps.get(0)?.start(), EndSyntax::Ruby);
            let props = INITIALIZE
                .captures(body)
                .map(|init| {
                    let keywords: Vec<String> =
                        KEYWORD_ARG.captures_iter(&init[1]).map(|k| k[1].to_string()).collect();
                    if keywords.is_empty() {
                        identifier_list(&init[1])
                    } else {
                        keywords
                    }
                })
                .unwrap_or_default();
            Some(Component::new(&caps[1], props, rel))
        })
        .collect()
}

/// Service objects under `app/services`.
pub fn ruby_services(ws: &Workspace) -> Vec<Service> {
    ws.scan(SERVICE_GLOBS, service_classes)
}

pub(crate) fn service_classes(rel: &str, content: &str) -> Vec<Service> {
    CLASS_OR_MODULE
        .captures_iter(content)
        .filter_map(|caps| {
            let body = end_body(content, caps.get(0)?.start(), EndSyntax::Ruby);
            let functions = action_names(public_defs(body).into_iter().map(|(_, name)| name));
            Service::with_functions(&caps[1], functions, rel)
        })
        .collect()
}
