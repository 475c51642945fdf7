//! Server-side JavaScript and TypeScript extractors: Express, Fastify and
//! Hono routes, Mongoose/Sequelize/Prisma/TypeORM models, TypeScript
//! interfaces, controllers and services.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

use crate::extract::text::{
    action_names, brace_body, brace_body_after, file_stem, normalize_route, paren_body,
    pascal_case, split_top_level, MAX_FIELDS,
};
use crate::extract::{Controller, Field, Model, Route, Service, Workspace};

const SERVER_GLOBS: &[&str] = &["**/*.{js,mjs,cjs,ts,mts,cts}"];
const PRISMA_GLOBS: &[&str] = &["**/*.prisma"];
const CONTROLLER_GLOBS: &[&str] = &[
    "**/controllers/**/*.{js,mjs,ts}",
    "**/*.controller.{js,mjs,ts}",
    "**/*Controller.{js,mjs,ts}",
];
const SERVICE_GLOBS: &[&str] = &[
    "**/services/**/*.{js,mjs,ts}",
    "**/*.service.{js,mjs,ts}",
    "**/*Service.{js,mjs,ts}",
];

/// Receivers whose `.get('/x')` is an outgoing request or a lookup.
const CLIENT_RECEIVERS: &[&str] = &[
    "axios", "http", "https", "fetch", "res", "req", "client", "request", "map", "cache",
    "headers", "params", "query", "this", "api_client", "ky", "got", "superagent",
];

lazy_static! {
    static ref VERB_CALL: Regex = Regex::new(
        r#"\b(\w+)\.(get|post|put|patch|delete|options|head|all)\(\s*['"`]([^'"`]*)['"`]"#
    )
    .unwrap();
    static ref CHAINED_ROUTE: Regex =
        Regex::new(r#"\.route\(\s*['"`]([^'"`]+)['"`]\s*\)"#).unwrap();
    static ref CHAINED_VERB: Regex =
        Regex::new(r"^\s*\.(get|post|put|patch|delete|all)\(").unwrap();
    static ref ROUTE_OBJECT: Regex = Regex::new(r"\.route\(\s*\{").unwrap();
    static ref OBJ_METHOD: Regex =
        Regex::new(r#"\bmethod\s*:\s*(?:['"](\w+)['"]|\[([^\]]*)\])"#).unwrap();
    static ref OBJ_URL: Regex = Regex::new(r#"\b(?:url|path)\s*:\s*['"`]([^'"`]+)['"`]"#).unwrap();
    static ref OBJ_HANDLER: Regex = Regex::new(r"\bhandler\s*:\s*([\w.]+)").unwrap();
    static ref QUOTED_WORD: Regex = Regex::new(r#"['"](\w+)['"]"#).unwrap();
    static ref PLAIN_IDENT: Regex = Regex::new(r"^[A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*$").unwrap();

    static ref SCHEMA_DECL: Regex = Regex::new(
        r"(?:(?:const|let|var)\s+(\w+)\s*=\s*)?new\s+(?:mongoose\.)?Schema(?:<[^>]*>)?\(\s*\{"
    )
    .unwrap();
    static ref MODEL_BINDING: Regex =
        Regex::new(r#"\bmodel(?:<[^>]*>)?\(\s*['"](\w+)['"]\s*,\s*(\w+)"#).unwrap();
    static ref SEQUELIZE_DEFINE: Regex =
        Regex::new(r#"\.define\(\s*['"](\w+)['"]\s*,\s*\{"#).unwrap();
    static ref SEQUELIZE_INIT: Regex = Regex::new(r"\b([A-Z]\w*)\.init\(\s*\{").unwrap();
    static ref PRISMA_MODEL: Regex = Regex::new(r"(?m)^\s*model\s+(\w+)\s*\{").unwrap();
    static ref PRISMA_FIELD: Regex = Regex::new(r"^\s*(\w+)\s+([\w\[\]?]+)").unwrap();
    static ref TS_INTERFACE: Regex = Regex::new(
        r"(?m)^\s*(?:export\s+)?(?:default\s+)?interface\s+(\w+)(?:<[^>{]*>)?(?:\s+extends\s+[^{]+)?\s*\{"
    )
    .unwrap();
    static ref TS_TYPE_LITERAL: Regex =
        Regex::new(r"(?m)^\s*(?:export\s+)?type\s+(\w+)(?:<[^>=]*>)?\s*=\s*\{").unwrap();
    static ref ENTITY_CLASS: Regex = Regex::new(
        r"@Entity\([^)]*\)\s*(?:@\w+\([^)]*\)\s*)*(?:export\s+)?(?:default\s+)?class\s+(\w+)[^{]*\{"
    )
    .unwrap();
    static ref TS_MEMBER: Regex =
        Regex::new(r"^(?:readonly\s+)?(?:public\s+)?([A-Za-z_$][\w$]*)[?!]?\s*:\s*(.+)$").unwrap();
    static ref DECORATOR_PREFIX: Regex = Regex::new(r"^(?:@\w+(?:\([^)]*\))?\s*)+").unwrap();

    static ref CLASS_DECL: Regex =
        Regex::new(r"(?m)^\s*(?:export\s+)?(?:default\s+)?class\s+(\w+)[^{]*\{").unwrap();
    static ref CLASS_METHOD: Regex = Regex::new(
        r"(?m)^\s*(?:(public|private|protected)\s+)?(?:static\s+)?(?:async\s+)?(#?\w+)\s*(?:<[^>]*>)?\([^)]*\)\s*(?::\s*[^{;]+)?\{"
    )
    .unwrap();
    static ref CLASS_ARROW: Regex = Regex::new(
        r"(?m)^\s*(?:(public|private|protected)\s+)?(?:static\s+)?(#?\w+)\s*=\s*(?:async\s*)?(?:\([^)]*\)|\w+)\s*=>"
    )
    .unwrap();
    static ref EXPORTED_FN: Regex = Regex::new(
        r"(?m)^\s*export\s+(?:default\s+)?(?:async\s+)?function\s*\*?\s*(\w+)|^\s*export\s+const\s+(\w+)\s*=\s*(?:async\s*)?(?:function\b|\([^)]*\)\s*(?::\s*[^=]+)?=>|\w+\s*=>)|\bexports\.(\w+)\s*="
    )
    .unwrap();
    static ref MODULE_EXPORTS: Regex = Regex::new(r"module\.exports\s*=\s*\{").unwrap();
}

/// Express, Fastify, Hono and plain Node HTTP routes.
pub fn server_routes(ws: &Workspace) -> Vec<Route> {
    ws.scan(SERVER_GLOBS, route_calls)
}

/// `x.verb('/p', ..., handler)`, `.route('/p').get(..)` and Fastify
/// `.route({ method, url, handler })` declarations.
pub(crate) fn route_calls(rel: &str, content: &str) -> Vec<Route> {
    let mut found: Vec<(usize, Route)> = Vec::new();

    for caps in VERB_CALL.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        let receiver = &caps[1];
        if CLIENT_RECEIVERS.contains(&receiver) {
            continue;
        }
        let path = &caps[3];
        if !path.starts_with('/') && path != "*" {
            continue;
        }
        let method = match &caps[2] {
            "all" => "ANY",
            verb => verb,
        };
        let open = whole.start() + receiver.len() + caps[2].len() + 1;
        let handler = paren_body(content, open).and_then(|args| last_identifier_arg(args, 1));
        found.push((whole.start(), Route::new(method, normalize_route(path), handler, rel)));
    }

    for caps in CHAINED_ROUTE.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        let path = normalize_route(&caps[1]);
        let mut at = whole.end();
        while let Some(verb) = CHAINED_VERB.captures(&content[at..]) {
            let Some(verb_match) = verb.get(0) else { break };
            let open = at + verb_match.end() - 1;
            let Some(args) = paren_body(content, open) else { break };
            found.push((
                at,
                Route::new(&verb[1], path.clone(), last_identifier_arg(args, 0), rel),
            ));
            at = open + args.len() + 2;
        }
    }

    for m in ROUTE_OBJECT.find_iter(content) {
        let Some(body) = brace_body(content, m.end() - 1) else { continue };
        let Some(url) = OBJ_URL.captures(body) else { continue };
        let handler = OBJ_HANDLER.captures(body).map(|c| c[1].to_string());
        let methods: Vec<String> = match OBJ_METHOD.captures(body) {
            Some(c) => match (c.get(1), c.get(2)) {
                (Some(single), _) => vec![single.as_str().to_string()],
                (None, Some(list)) => QUOTED_WORD
                    .captures_iter(list.as_str())
                    .map(|q| q[1].to_string())
                    .collect(),
                _ => Vec::new(),
            },
            None => vec!["ANY".to_string()],
        };
        for method in methods {
            found.push((
                m.start(),
                Route::new(&method, normalize_route(&url[1]), handler.clone(), rel),
            ));
        }
    }

    found.sort_by_key(|(at, _)| *at);
    found.into_iter().map(|(_, route)| route).collect()
}

/// Last argument after the first `skip` that is a bare (possibly dotted)
/// identifier.
fn last_identifier_arg(args: &str, skip: usize) -> Option<String> {
    split_top_level(args, &[','])
        .into_iter()
        .skip(skip)
        .filter(|arg| PLAIN_IDENT.is_match(arg))
        .last()
        .map(str::to_string)
}

/// Mongoose, Sequelize and Prisma models.
pub fn javascript_models(ws: &Workspace) -> Vec<Model> {
    let mut models = ws.scan(SERVER_GLOBS, schema_models);
    models.extend(ws.scan(PRISMA_GLOBS, prisma_models));
    models
}

/// Everything `javascript_models` finds plus interfaces, object type
/// aliases and TypeORM entities.
pub fn typescript_models(ws: &Workspace) -> Vec<Model> {
    let mut models = ws.scan(SERVER_GLOBS, |rel, content| {
        let mut found = schema_models(rel, content);
        if rel.ends_with(".ts") || rel.ends_with(".mts") || rel.ends_with(".cts") {
            found.extend(typed_models(rel, content));
        }
        found
    });
    models.extend(ws.scan(PRISMA_GLOBS, prisma_models));
    models
}

pub(crate) fn schema_models(rel: &str, content: &str) -> Vec<Model> {
    let bindings: HashMap<String, String> = MODEL_BINDING
        .captures_iter(content)
        .map(|c| (c[2].to_string(), c[1].to_string()))
        .collect();

    let mut models = Vec::new();

    for caps in SCHEMA_DECL.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        let Some(body) = brace_body(content, whole.end() - 1) else { continue };
        let var = caps.get(1).map(|v| v.as_str());
        let name = match var {
            Some(var) => bindings
                .get(var)
                .cloned()
                .unwrap_or_else(|| pascal_case(var.trim_end_matches("Schema").trim_end_matches("schema"))),
            None => pascal_case(file_stem(rel)),
        };
        if let Some(model) = Model::new(name, object_fields(body), rel).non_empty() {
            models.push(model);
        }
    }

    for caps in SEQUELIZE_DEFINE.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        let Some(body) = brace_body(content, whole.end() - 1) else { continue };
        if let Some(model) = Model::new(pascal_case(&caps[1]), object_fields(body), rel).non_empty() {
            models.push(model);
        }
    }

    for caps in SEQUELIZE_INIT.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        let Some(body) = brace_body(content, whole.end() - 1) else { continue };
        if let Some(model) = Model::new(&caps[1], object_fields(body), rel).non_empty() {
            models.push(model);
        }
    }

    models
}

/// Top-level `key: value` entries of an object literal.
fn object_fields(body: &str) -> Vec<Field> {
    split_top_level(body, &[','])
        .into_iter()
        .filter_map(|entry| {
            let (key, value) = entry.split_once(':')?;
            let key = key.trim().trim_matches(&['\'', '"'][..]);
            if key.is_empty() || !key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$') {
                return None;
            }
            Some(Field::new(key, value_type(value.trim())))
        })
        .take(MAX_FIELDS)
        .collect()
}

/// Type name of a schema value: `String`, `{ type: Number }`, `[String]`,
/// `DataTypes.STRING(64)`.
fn value_type(value: &str) -> String {
    lazy_static! {
        static ref TYPE_KEY: Regex = Regex::new(r"\btype\s*:\s*(\[?[\w.]+\]?)").unwrap();
    }
    let raw = if value.starts_with('{') {
        match TYPE_KEY.captures(value) {
            Some(c) => c[1].to_string(),
            None => return "Object".to_string(),
        }
    } else if value.starts_with('[') {
        return "Array".to_string();
    } else {
        value.to_string()
    };
    let raw = raw.split('(').next().unwrap_or(&raw);
    let raw = raw.rsplit('.').next().unwrap_or(raw);
    raw.trim().to_string()
}

pub(crate) fn prisma_models(rel: &str, content: &str) -> Vec<Model> {
    PRISMA_MODEL
        .captures_iter(content)
        .filter_map(|caps| {
            let body = brace_body(content, caps.get(0)?.end() - 1)?;
            let fields = body
                .lines()
                .map(str::trim)
                .filter(|l| !l.starts_with("@@") && !l.starts_with("//"))
                .filter_map(|l| PRISMA_FIELD.captures(l))
                .map(|c| Field::new(&c[1], &c[2]))
                .take(MAX_FIELDS)
                .collect();
            Model::new(&caps[1], fields, rel).non_empty()
        })
        .collect()
}

/// Interfaces, object type aliases and `@Entity` classes.
pub(crate) fn typed_models(rel: &str, content: &str) -> Vec<Model> {
    let mut found: Vec<(usize, Model)> = Vec::new();

    for pattern in [&*TS_INTERFACE, &*TS_TYPE_LITERAL, &*ENTITY_CLASS] {
        for caps in pattern.captures_iter(content) {
            let Some(whole) = caps.get(0) else { continue };
            let name = &caps[1];
            if name.ends_with("Props") || name.ends_with("State") {
                continue;
            }
            if found.iter().any(|(_, m)| m.name == name) {
                continue;
            }
            let Some(body) = brace_body(content, whole.end() - 1) else { continue };
            if let Some(model) = Model::new(name, member_fields(body), rel).non_empty() {
                found.push((whole.start(), model));
            }
        }
    }

    found.sort_by_key(|(at, _)| *at);
    found.into_iter().map(|(_, m)| m).collect()
}

/// `name: Type` members of an interface, type literal or class body.
fn member_fields(body: &str) -> Vec<Field> {
    split_top_level(body, &[';', '\n', ','])
        .into_iter()
        .filter_map(|member| {
            let member = DECORATOR_PREFIX.replace(member, "");
            let caps = TS_MEMBER.captures(member.trim())?;
            let ty = caps[2].trim().trim_end_matches(';');
            let ty = ty.split('=').next().unwrap_or(ty).trim();
            if ty.contains("=>") || ty.is_empty() {
                return None;
            }
            Some(Field::new(&caps[1], ty))
        })
        .take(MAX_FIELDS)
        .collect()
}

/// Controller classes and controller modules.
pub fn node_controllers(ws: &Workspace) -> Vec<Controller> {
    ws.scan(CONTROLLER_GLOBS, |rel, content| {
        code_units(rel, content)
            .into_iter()
            .filter_map(|(name, functions)| Controller::with_actions(name, functions, rel))
            .collect()
    })
}

/// Service classes and service modules.
pub fn node_services(ws: &Workspace) -> Vec<Service> {
    ws.scan(SERVICE_GLOBS, |rel, content| {
        code_units(rel, content)
            .into_iter()
            .filter_map(|(name, functions)| Service::with_functions(name, functions, rel))
            .collect()
    })
}

/// `(name, public functions)` for each class in a file, then one entry named
/// after the file for its exported functions.
pub(crate) fn code_units(rel: &str, content: &str) -> Vec<(String, Vec<String>)> {
    let mut units = Vec::new();

    for caps in CLASS_DECL.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        let Some(body) = brace_body(content, whole.end() - 1) else { continue };
        let mut ordered: Vec<(usize, String)> = CLASS_METHOD
            .captures_iter(body)
            .chain(CLASS_ARROW.captures_iter(body))
            .filter(|c| c.get(1).map(|v| v.as_str() == "public").unwrap_or(true))
            .filter_map(|c| c.get(2))
            .filter(|name| !name.as_str().starts_with('#') && !name.as_str().starts_with('_'))
            .map(|name| (name.start(), name.as_str().to_string()))
            .collect();
        ordered.sort_by_key(|(at, _)| *at);
        units.push((caps[1].to_string(), action_names(ordered.into_iter().map(|(_, n)| n))));
    }

    let mut exported: Vec<String> = EXPORTED_FN
        .captures_iter(content)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)).or_else(|| c.get(3)))
        .map(|m| m.as_str().to_string())
        .collect();
    if let Some(m) = MODULE_EXPORTS.find(content) {
        if let Some(body) = brace_body_after(content, m.end() - 1) {
            exported.extend(
                split_top_level(body, &[','])
                    .into_iter()
                    .map(|entry| entry.split(':').next().unwrap_or(entry).trim())
                    .filter(|name| PLAIN_IDENT.is_match(name))
                    .map(str::to_string),
            );
        }
    }
    let exported = action_names(exported);
    if !exported.is_empty() {
        units.push((file_stem(rel).to_string(), exported));
    }

    units
}
