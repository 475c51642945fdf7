//! PHP extractors: Laravel and Symfony routes, Eloquent/Doctrine models and
//! migrations, controllers, Blade components and service classes.

use lazy_static::lazy_static;
use regex::Regex;

use crate::extract::text::{
    action_names, brace_body, brace_body_after, join_route, paren_body, pascal_case, rest_actions,
    singularize, split_top_level, RestStyle, MAX_FIELDS,
};
use crate::extract::{Component, Controller, Field, Model, Route, Service, Workspace};

const PHP_GLOBS: &[&str] = &["**/*.php"];

lazy_static! {
    static ref CLASS_DECL: Regex = Regex::new(
        r"(?m)^[ \t]*(?:(?:final|abstract|readonly)\s+)*class\s+(\w+)(?:\s+extends\s+([\w\\]+))?"
    )
    .unwrap();
    static ref QUOTED: Regex = Regex::new(r#"['"]([^'"]*)['"]"#).unwrap();
    static ref PUBLIC_FUNCTION: Regex =
        Regex::new(r"(?m)^[ \t]*(?:final\s+)?public\s+(?:static\s+)?function\s+(\w+)\s*\(").unwrap();
    static ref FUNCTION_NAME: Regex = Regex::new(r"\bfunction\s+(\w+)\s*\(").unwrap();
    static ref CLASS_WORD: Regex = Regex::new(r"\bclass\s+\w+").unwrap();

    static ref LARAVEL_VERB: Regex =
        Regex::new(r"Route::(get|post|put|patch|delete|options|any|match)\s*\(").unwrap();
    static ref LARAVEL_RESOURCE: Regex = Regex::new(r"Route::(resource|apiResource)\s*\(").unwrap();
    static ref RESOURCE_FILTER: Regex = Regex::new(r"->\s*(only|except)\s*\(([^)]*)\)").unwrap();
    static ref GROUP_CHAIN: Regex =
        Regex::new(r#"Route::[^;]*?prefix\(\s*['"]([^'"]*)['"]\s*\)[^;]*?->\s*group\s*\("#).unwrap();
    static ref GROUP_ARRAY: Regex = Regex::new(r"Route::group\s*\(\s*\[([^\]]*)\]").unwrap();
    static ref PREFIX_OPTION: Regex = Regex::new(r#"['"]prefix['"]\s*=>\s*['"]([^'"]*)['"]"#).unwrap();

    static ref SYMFONY_ROUTE: Regex =
        Regex::new(r#"(?:#\[Route|@Route)\(\s*(?:path\s*[:=]\s*)?['"]([^'"]*)['"]([^\n]*)"#).unwrap();
    static ref SYMFONY_METHODS: Regex = Regex::new(r"methods\s*[:=]\s*[\[{]([^\]}]*)[\]}]").unwrap();

    static ref FILLABLE: Regex = Regex::new(r"\$fillable\s*=\s*\[([^\]]*)\]").unwrap();
    static ref CASTS: Regex = Regex::new(r"\$casts\s*=\s*\[([^\]]*)\]").unwrap();
    static ref CAST_ENTRY: Regex = Regex::new(r#"['"](\w+)['"]\s*=>\s*['"]?([\w:\\]+)"#).unwrap();
    static ref TYPED_PROPERTY: Regex = Regex::new(
        r"(?m)^[ \t]*(?:public|protected|private)\s+(?:readonly\s+)?(static\s+)?(\??[\w\\|]+)\s+\$(\w+)"
    )
    .unwrap();
    static ref SCHEMA_CREATE: Regex = Regex::new(r#"Schema::create\(\s*['"](\w+)['"]"#).unwrap();
    static ref TABLE_COLUMN: Regex = Regex::new(r#"\$table->(\w+)\(\s*(?:['"](\w+)['"])?"#).unwrap();
    static ref BLADE_PROPS: Regex = Regex::new(r"(?s)@props\s*\(\s*\[(.*?)\]\s*\)").unwrap();
}

fn unquote(s: &str) -> &str {
    s.trim().trim_matches(&['\'', '"'][..])
}

/// Last namespace segment of a class reference, without `::class`.
fn class_ref(s: &str) -> String {
    let s = unquote(s).trim_end_matches("::class");
    s.rsplit('\\').next().unwrap_or(s).to_string()
}

/// Byte range of the body of the first brace block at or after `from`.
fn brace_span(content: &str, from: usize) -> Option<(usize, usize)> {
    let open = from + content.get(from..)?.find('{')?;
    let body = brace_body(content, open)?;
    Some((open + 1, open + 1 + body.len()))
}

/// Laravel route files under `routes/`.
pub fn laravel_routes(ws: &Workspace) -> Vec<Route> {
    ws.scan(&["routes/**/*.php"], route_file)
}

pub(crate) fn route_file(rel: &str, content: &str) -> Vec<Route> {
    // RouteServiceProvider mounts routes/api.php under /api.
    let file_prefix = if rel.ends_with("routes/api.php") { "api" } else { "" };

    let mut groups: Vec<(usize, usize, String)> = Vec::new();
    for caps in GROUP_CHAIN.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        if let Some((start, end)) = brace_span(content, whole.end()) {
            groups.push((start, end, caps[1].to_string()));
        }
    }
    for caps in GROUP_ARRAY.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        let Some(prefix) = PREFIX_OPTION.captures(&caps[1]) else { continue };
        if let Some((start, end)) = brace_span(content, whole.end()) {
            groups.push((start, end, prefix[1].to_string()));
        }
    }
    groups.sort_by_key(|(start, _, _)| *start);

    let prefix_at = |at: usize| {
        groups
            .iter()
            .filter(|(start, end, _)| *start <= at && at < *end)
            .fold(file_prefix.to_string(), |acc, (_, _, p)| join_route(&acc, p))
    };

    let mut found: Vec<(usize, Route)> = Vec::new();

    for caps in LARAVEL_VERB.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        let Some(args) = paren_body(content, whole.end() - 1) else { continue };
        let mut pieces = split_top_level(args, &[',']).into_iter();
        let methods: Vec<String> = if &caps[1] == "match" {
            let Some(list) = pieces.next() else { continue };
            QUOTED.captures_iter(list).map(|m| m[1].to_string()).collect()
        } else {
            vec![caps[1].to_string()]
        };
        let Some(path) = pieces.next() else { continue };
        let handler = pieces.next().and_then(route_action);
        let path = join_route(&prefix_at(whole.start()), unquote(path));
        for method in methods {
            found.push((whole.start(), Route::new(&method, path.clone(), handler.clone(), rel)));
        }
    }

    for caps in LARAVEL_RESOURCE.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        let open = whole.end() - 1;
        let Some(args) = paren_body(content, open) else { continue };
        let pieces = split_top_level(args, &[',']);
        let (Some(name), Some(controller)) = (pieces.first(), pieces.get(1)) else { continue };
        let controller = class_ref(controller);

        let chain_start = open + args.len() + 2;
        let chain_end = content[chain_start..].find(';').map_or(content.len(), |p| chain_start + p);
        let chain = &content[chain_start..chain_end];
        let mut only: Option<Vec<String>> = None;
        let mut except: Vec<String> = Vec::new();
        for filter in RESOURCE_FILTER.captures_iter(chain) {
            let actions = QUOTED.captures_iter(&filter[2]).map(|m| m[1].to_string());
            if &filter[1] == "only" {
                only = Some(actions.collect());
            } else {
                except.extend(actions);
            }
        }

        let segments: Vec<&str> = unquote(name).split('.').collect();
        let mut base = String::new();
        for (i, segment) in segments.iter().enumerate() {
            base.push('/');
            base.push_str(segment);
            if i + 1 < segments.len() {
                base.push_str(&format!("/:{}_id", singularize(segment)));
            }
        }

        let style = if &caps[1] == "apiResource" {
            RestStyle::LaravelApi
        } else {
            RestStyle::Laravel
        };
        let prefix = prefix_at(whole.start());
        for (action, method, suffix) in rest_actions(style) {
            if only.as_ref().map_or(false, |o| !o.iter().any(|a| a.as_str() == *action))
                || except.iter().any(|a| a.as_str() == *action)
            {
                continue;
            }
            found.push((
                whole.start(),
                Route::new(
                    method,
                    join_route(&prefix, &format!("{}{}", base, suffix)),
                    Some(format!("{}@{}", controller, action)),
                    rel,
                ),
            ));
        }
    }

    found.sort_by_key(|(at, _)| *at);
    found.into_iter().map(|(_, r)| r).collect()
}

/// `'Ctrl@action'`, `[Ctrl::class, 'action']` or an invokable `Ctrl::class`.
fn route_action(arg: &str) -> Option<String> {
    let arg = arg.trim();
    if let Some(list) = arg.strip_prefix('[').and_then(|a| a.strip_suffix(']')) {
        let parts = split_top_level(list, &[',']);
        let controller = class_ref(parts.first()?);
        return Some(match parts.get(1) {
            Some(action) => format!("{}@{}", controller, unquote(action)),
            None => controller,
        });
    }
    if arg.starts_with('\'') || arg.starts_with('"') {
        return Some(unquote(arg).to_string());
    }
    if arg.ends_with("::class") {
        return Some(class_ref(arg));
    }
    None
}

/// Symfony `#[Route]` attributes and `@Route` annotations.
pub fn symfony_routes(ws: &Workspace) -> Vec<Route> {
    ws.scan(&["src/**/*.php"], attribute_routes)
}

pub(crate) fn attribute_routes(rel: &str, content: &str) -> Vec<Route> {
    let mut routes = Vec::new();
    let mut prefix = String::new();

    for caps in SYMFONY_ROUTE.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        let rest = &content[whole.end()..];
        let class_at = CLASS_WORD.find(rest).map(|m| m.start());
        let function = FUNCTION_NAME.captures(rest);
        let function_at = function.as_ref().and_then(|f| f.get(0)).map(|m| m.start());

        let class_level = match (class_at, function_at) {
            (Some(c), Some(f)) => c < f,
            (Some(_), None) => true,
            _ => false,
        };
        if class_level {
            prefix = caps[1].to_string();
            continue;
        }

        let mut methods: Vec<String> = SYMFONY_METHODS
            .captures(&caps[2])
            .map(|m| QUOTED.captures_iter(&m[1]).map(|q| q[1].to_string()).collect())
            .unwrap_or_default();
        if methods.is_empty() {
            methods.push("ANY".to_string());
        }
        let handler = function.map(|f| f[1].to_string());
        for method in methods {
            routes.push(Route::new(&method, join_route(&prefix, &caps[1]), handler.clone(), rel));
        }
    }
    routes
}

fn is_eloquent_base(base: &str) -> bool {
    let base = base.rsplit('\\').next().unwrap_or(base);
    matches!(base, "Model" | "Authenticatable" | "Pivot") || base.ends_with("Model")
}

fn in_model_dir(rel: &str) -> bool {
    rel.contains("/Entity/") || rel.contains("/Models/") || rel.starts_with("Entity/") || rel.starts_with("Models/")
}

/// Eloquent models and typed entity classes.
pub fn php_models(ws: &Workspace) -> Vec<Model> {
    ws.scan(PHP_GLOBS, class_models)
}

pub(crate) fn class_models(rel: &str, content: &str) -> Vec<Model> {
    let mut models = Vec::new();
    for caps in CLASS_DECL.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        let Some(body) = brace_body_after(content, whole.end()) else { continue };
        let eloquent = caps.get(2).map_or(false, |b| is_eloquent_base(b.as_str()));

        let mut fields: Vec<Field> = Vec::new();
        if eloquent {
            if let Some(fillable) = FILLABLE.captures(body) {
                fields.extend(
                    QUOTED
                        .captures_iter(&fillable[1])
                        .map(|q| Field::new(&q[1], "mixed")),
                );
            }
            if let Some(casts) = CASTS.captures(body) {
                for entry in CAST_ENTRY.captures_iter(&casts[1]) {
                    match fields.iter_mut().find(|f| f.name == entry[1]) {
                        Some(field) => field.ty = entry[2].to_string(),
                        None => fields.push(Field::new(&entry[1], &entry[2])),
                    }
                }
            }
        }
        if in_model_dir(rel) {
            fields.extend(
                TYPED_PROPERTY
                    .captures_iter(body)
                    .filter(|p| p.get(1).is_none())
                    .map(|p| Field::new(&p[3], p[2].trim_start_matches('?'))),
            );
        }
        fields.truncate(MAX_FIELDS);
        if let Some(model) = Model::new(&caps[1], fields, rel).non_empty() {
            models.push(model);
        }
    }
    models
}

/// Eloquent models merged with tables created by migrations.
pub fn laravel_models(ws: &Workspace) -> Vec<Model> {
    let mut models = php_models(ws);
    for table in ws.scan(&["database/migrations/**/*.php"], migration_models) {
        match models.iter_mut().find(|m| m.name == table.name) {
            Some(model) => {
                for field in table.fields {
                    if !model.fields.iter().any(|f| f.name == field.name) {
                        model.fields.push(field);
                    }
                }
            }
            None => models.push(table),
        }
    }
    models
}

pub(crate) fn migration_models(rel: &str, content: &str) -> Vec<Model> {
    SCHEMA_CREATE
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let body = brace_body_after(content, whole.end())?;
            let fields: Vec<Field> = TABLE_COLUMN
                .captures_iter(body)
                .filter_map(|col| match (&col[1], col.get(2)) {
                    ("id", None) => Some(Field::new("id", "id")),
                    (ty, Some(name)) if !matches!(ty, "foreign" | "index" | "unique" | "primary") => {
                        Some(Field::new(name.as_str(), ty))
                    }
                    _ => None,
                })
                .take(MAX_FIELDS)
                .collect();
            Model::new(pascal_case(&singularize(&caps[1])), fields, rel).non_empty()
        })
        .collect()
}

fn public_units(content: &str, accept: impl Fn(&str, Option<&str>) -> bool) -> Vec<(String, Vec<String>)> {
    CLASS_DECL
        .captures_iter(content)
        .filter(|caps| accept(&caps[1], caps.get(2).map(|b| b.as_str())))
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let body = brace_body_after(content, whole.end())?;
            let functions = PUBLIC_FUNCTION.captures_iter(body).map(|f| f[1].to_string());
            Some((caps[1].to_string(), action_names(functions)))
        })
        .collect()
}

/// `class XController extends ...` public functions.
pub fn php_controllers(ws: &Workspace) -> Vec<Controller> {
    ws.scan(PHP_GLOBS, |rel, content| {
        public_units(content, |name, base| name.ends_with("Controller") && base.is_some())
            .into_iter()
            .filter_map(|(name, actions)| Controller::with_actions(name, actions, rel))
            .collect()
    })
}

/// Anonymous Blade components and their `@props`.
pub fn blade_components(ws: &Workspace) -> Vec<Component> {
    ws.scan(&["resources/views/components/**/*.blade.php"], blade_component)
}

pub(crate) fn blade_component(rel: &str, content: &str) -> Vec<Component> {
    let name = rel
        .split_once("components/")
        .map_or(rel, |(_, tail)| tail)
        .trim_end_matches(".blade.php")
        .replace('/', ".");
    let props = BLADE_PROPS
        .captures(content)
        .map(|caps| {
            split_top_level(&caps[1], &[','])
                .into_iter()
                .filter_map(|entry| QUOTED.captures(entry).map(|q| q[1].to_string()))
                .collect()
        })
        .unwrap_or_default();
    vec![Component::new(name, props, rel)]
}

/// Classes under `app/Services`.
pub fn php_services(ws: &Workspace) -> Vec<Service> {
    ws.scan(&["app/Services/**/*.php"], |rel, content| {
        public_units(content, |_, _| true)
            .into_iter()
            .filter_map(|(name, functions)| Service::with_functions(name, functions, rel))
            .collect()
    })
}
