//! Frontend extractors: file-system routing (Next, Nuxt, SvelteKit),
//! client-side routers and React, Vue and Svelte components.

use lazy_static::lazy_static;
use regex::Regex;

use crate::extract::text::{
    brace_body, brace_body_after, dedup, file_stem, identifier_list, normalize_route, paren_body,
    split_top_level,
};
use crate::extract::{Component, Route, Workspace};

const NEXT_GLOBS: &[&str] = &[
    "pages/**/*.{js,jsx,ts,tsx,mdx}",
    "src/pages/**/*.{js,jsx,ts,tsx,mdx}",
    "app/**/{page,route}.{js,jsx,ts,tsx,mdx}",
    "src/app/**/{page,route}.{js,jsx,ts,tsx,mdx}",
];
const NUXT_GLOBS: &[&str] = &[
    "pages/**/*.vue",
    "src/pages/**/*.vue",
    "server/api/**/*.{js,ts}",
    "server/routes/**/*.{js,ts}",
];
const SVELTE_ROUTE_GLOBS: &[&str] = &["src/routes/**/+page.svelte", "src/routes/**/+server.{js,ts}"];
const CLIENT_ROUTER_GLOBS: &[&str] = &["**/*.{js,jsx,ts,tsx}", "**/*.vue"];
const REACT_GLOBS: &[&str] = &["**/*.{jsx,tsx}", "**/components/**/*.js"];
const VUE_GLOBS: &[&str] = &["**/*.vue"];
const SVELTE_GLOBS: &[&str] = &["**/*.svelte"];

const HTTP_VERBS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

lazy_static! {
    static ref EXPORTED_VERB: Regex = Regex::new(
        r"(?m)^\s*export\s+(?:async\s+function\s+|function\s+|const\s+)(GET|POST|PUT|PATCH|DELETE|HEAD|OPTIONS)\b"
    )
    .unwrap();
    static ref ROUTER_MARKER: Regex =
        Regex::new(r"createRouter|VueRouter|createBrowserRouter|createHashRouter|react-router|<Routes?\b")
            .unwrap();
    static ref ROUTE_OBJECT_PATH: Regex = Regex::new(r#"\bpath\s*:\s*['"`]([^'"`]*)['"`]"#).unwrap();
    static ref ROUTE_OBJECT_TARGET: Regex =
        Regex::new(r"\b(?:component|element)\s*:\s*(?:<\s*)?(?:\(\)\s*=>\s*import\([^)]*\)|(\w+))").unwrap();
    static ref JSX_ROUTE: Regex = Regex::new(r"<Route\b([^>]*)>").unwrap();
    static ref JSX_PATH: Regex = Regex::new(r#"\bpath\s*=\s*\{?\s*['"`]([^'"`]*)['"`]"#).unwrap();
    static ref JSX_TARGET: Regex =
        Regex::new(r"\b(?:element|component|Component)\s*=\s*\{\s*<?\s*(\w+)").unwrap();

    static ref FUNCTION_COMPONENT: Regex = Regex::new(
        r"(?m)^\s*(?:export\s+)?(?:default\s+)?function\s+([A-Z]\w*)\s*(?:<[^>(]*>)?\s*\("
    )
    .unwrap();
    static ref ARROW_COMPONENT: Regex = Regex::new(
        r"(?m)^\s*(?:export\s+)?const\s+([A-Z]\w*)\s*(?::\s*[\w.<>, ]+)?=\s*(?:React\.)?(?:memo|forwardRef)?(?:<[^>(]*>)?\(?\s*(?:async\s*)?(?:function\s*\w*\s*)?\("
    )
    .unwrap();
    static ref CLASS_COMPONENT: Regex = Regex::new(
        r"(?m)^\s*(?:export\s+)?(?:default\s+)?class\s+([A-Z]\w*)\s+extends\s+(?:React\.)?(?:Pure)?Component\b(?:\s*<\s*(\w+))?"
    )
    .unwrap();
    static ref PARAM_TYPE: Regex = Regex::new(r":\s*(?:Readonly<)?([A-Z]\w*)").unwrap();
    static ref PROPS_ACCESS: Regex = Regex::new(r"(?:^|[^.\w])props\.(\w+)").unwrap();
    static ref THIS_PROPS_ACCESS: Regex = Regex::new(r"\bthis\.props\.(\w+)").unwrap();

    static ref DEFINE_PROPS_TYPED: Regex = Regex::new(r"defineProps\s*<\s*(\{|\w+)").unwrap();
    static ref DEFINE_PROPS_CALL: Regex = Regex::new(r"defineProps\s*\(\s*([\[{])").unwrap();
    static ref OPTIONS_PROPS: Regex = Regex::new(r"\bprops\s*:\s*([\[{])").unwrap();
    static ref QUOTED: Regex = Regex::new(r#"['"`](\w+)['"`]"#).unwrap();

    static ref EXPORT_LET: Regex = Regex::new(r"(?m)^\s*export\s+let\s+(\w+)").unwrap();
    static ref RUNES_PROPS: Regex =
        Regex::new(r"let\s*\{([^}]*)\}\s*(?::\s*[^=]+)?=\s*\$props\(\s*\)").unwrap();
}

/// Next.js `pages/` and `app/` routes.
pub fn next_routes(ws: &Workspace) -> Vec<Route> {
    ws.scan(NEXT_GLOBS, next_file_routes)
}

pub(crate) fn next_file_routes(rel: &str, content: &str) -> Vec<Route> {
    let path = rel.strip_prefix("src/").unwrap_or(rel);

    if let Some(page) = path.strip_prefix("pages/") {
        let stem = route_stem(page);
        if stem.starts_with('_') {
            return Vec::new();
        }
        let method = if page.starts_with("api/") { "ANY" } else { "GET" };
        let dirs = page.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
        let url = route_from_segments(dirs.split('/').chain(std::iter::once(stem)));
        return vec![Route::new(method, url, None, rel)];
    }

    if let Some(app) = path.strip_prefix("app/") {
        let dirs = app.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
        let url = route_from_segments(dirs.split('/'));
        return if file_stem(app) == "page" {
            vec![Route::new("GET", url, None, rel)]
        } else {
            exported_verb_routes(rel, content, &url)
        };
    }

    Vec::new()
}

/// Nuxt `pages/` and Nitro `server/` routes.
pub fn nuxt_routes(ws: &Workspace) -> Vec<Route> {
    ws.scan(NUXT_GLOBS, nuxt_file_routes)
}

pub(crate) fn nuxt_file_routes(rel: &str, _content: &str) -> Vec<Route> {
    let path = rel.strip_prefix("src/").unwrap_or(rel);

    if let Some(page) = path.strip_prefix("pages/") {
        let dirs = page.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
        let url = route_from_segments(dirs.split('/').chain(std::iter::once(route_stem(page))));
        return vec![Route::new("GET", url, None, rel)];
    }

    let (base, rest) = if let Some(rest) = path.strip_prefix("server/api/") {
        ("api", rest)
    } else if let Some(rest) = path.strip_prefix("server/routes/") {
        ("", rest)
    } else {
        return Vec::new();
    };

    // `users/[id].get.ts` -> GET /api/users/:id
    let dirs = rest.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
    let mut stem = route_stem(rest);
    let mut method = "ANY".to_string();
    if let Some((name, suffix)) = stem.rsplit_once('.') {
        let verb = suffix.to_uppercase();
        if HTTP_VERBS.contains(&verb.as_str()) {
            stem = name;
            method = verb;
        }
    }
    let url = route_from_segments(
        std::iter::once(base)
            .chain(dirs.split('/'))
            .chain(std::iter::once(stem)),
    );
    vec![Route::new(&method, url, None, rel)]
}

/// SvelteKit `+page.svelte` and `+server` routes.
pub fn svelte_routes(ws: &Workspace) -> Vec<Route> {
    ws.scan(SVELTE_ROUTE_GLOBS, svelte_file_routes)
}

pub(crate) fn svelte_file_routes(rel: &str, content: &str) -> Vec<Route> {
    let Some(route) = rel.strip_prefix("src/routes/") else {
        return Vec::new();
    };
    let dirs = route.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
    let url = route_from_segments(dirs.split('/'));
    if file_stem(route) == "+page" {
        vec![Route::new("GET", url, None, rel)]
    } else {
        exported_verb_routes(rel, content, &url)
    }
}

/// One route per exported HTTP verb handler; `ANY` when none is exported.
fn exported_verb_routes(rel: &str, content: &str, url: &str) -> Vec<Route> {
    let verbs = dedup(EXPORTED_VERB.captures_iter(content).map(|c| c[1].to_string()));
    if verbs.is_empty() {
        return vec![Route::new("ANY", url, None, rel)];
    }
    verbs
        .into_iter()
        .map(|verb| Route::new(&verb, url, Some(verb.clone()), rel))
        .collect()
}

/// Last path segment without its final extension (`[...slug].ts` -> `[...slug]`).
fn route_stem(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(name)
}

/// URL path from file-system segments: `index` and route groups `(x)` and
/// parallel-route slots `@x` vanish, `[id]` becomes `:id`.
fn route_from_segments<'a, I>(segments: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let kept: Vec<&str> = segments
        .into_iter()
        .filter(|s| !s.is_empty() && *s != "index")
        .filter(|s| !(s.starts_with('(') && s.ends_with(')')))
        .filter(|s| !s.starts_with('@'))
        .collect();
    normalize_route(&kept.join("/"))
}

/// vue-router and react-router route tables.
pub fn client_routes(ws: &Workspace) -> Vec<Route> {
    ws.scan(CLIENT_ROUTER_GLOBS, router_table_routes)
}

pub(crate) fn router_table_routes(rel: &str, content: &str) -> Vec<Route> {
    if !ROUTER_MARKER.is_match(content) {
        return Vec::new();
    }

    let mut found: Vec<(usize, Route)> = Vec::new();

    for caps in ROUTE_OBJECT_PATH.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        // the target lives in the same object literal, before the next `}` or `{`
        let tail = &content[whole.end()..];
        let end = tail.find(&['}', '{', '['][..]).unwrap_or(tail.len());
        let handler = ROUTE_OBJECT_TARGET
            .captures(&tail[..end])
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());
        found.push((whole.start(), Route::new("GET", normalize_route(&caps[1]), handler, rel)));
    }

    for caps in JSX_ROUTE.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        let attrs = &caps[1];
        let Some(path) = JSX_PATH.captures(attrs) else { continue };
        let handler = JSX_TARGET.captures(attrs).map(|c| c[1].to_string());
        found.push((whole.start(), Route::new("GET", normalize_route(&path[1]), handler, rel)));
    }

    found.sort_by_key(|(at, _)| *at);
    found.into_iter().map(|(_, r)| r).collect()
}

/// React function, arrow and class components.
pub fn react_components(ws: &Workspace) -> Vec<Component> {
    ws.scan(REACT_GLOBS, react_file_components)
}

pub(crate) fn react_file_components(rel: &str, content: &str) -> Vec<Component> {
    let mut found: Vec<(usize, Component)> = Vec::new();

    for pattern in [&*FUNCTION_COMPONENT, &*ARROW_COMPONENT] {
        for caps in pattern.captures_iter(content) {
            let Some(whole) = caps.get(0) else { continue };
            let name = &caps[1];
            if found.iter().any(|(_, c)| c.name == name) {
                continue;
            }
            let params = paren_body(content, whole.end() - 1).unwrap_or("");
            let props = component_props(content, declaration_text(content, whole.start()), name, params);
            found.push((whole.start(), Component::new(name, props, rel)));
        }
    }

    for caps in CLASS_COMPONENT.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        let name = &caps[1];
        let mut props = caps
            .get(2)
            .map(|t| type_members(content, t.as_str()))
            .unwrap_or_default();
        if props.is_empty() {
            props = dedup(THIS_PROPS_ACCESS.captures_iter(content).map(|c| c[1].to_string()));
        }
        found.push((whole.start(), Component::new(name, props, rel)));
    }

    found.sort_by_key(|(at, _)| *at);
    found.into_iter().map(|(_, c)| c).collect()
}

/// Text of the top-level declaration starting at `from`, up to the next line
/// that begins a new top-level statement.
fn declaration_text(content: &str, from: usize) -> &str {
    let rest = &content[from..];
    let first_line = rest.find('\n').map(|p| p + 1).unwrap_or(rest.len());
    let mut end = first_line;
    for line in rest[first_line..].split_inclusive('\n') {
        if line.starts_with(|c: char| c.is_alphabetic() || c == '@') {
            break;
        }
        end += line.len();
    }
    &rest[..end]
}

/// Props of a function component from its parameter list: destructured
/// names, the annotated props type, `props.x` accesses in its body or a
/// `<Name>Props` type in the same file.
fn component_props(content: &str, declaration: &str, name: &str, params: &str) -> Vec<String> {
    let params = params.trim();

    if params.starts_with('{') {
        if let Some(inner) = brace_body(params, 0) {
            return identifier_list(inner);
        }
    }

    if let Some(ty) = PARAM_TYPE.captures(params) {
        let members = type_members(content, &ty[1]);
        if !members.is_empty() {
            return members;
        }
    }

    if params.starts_with("props") {
        let accessed = dedup(PROPS_ACCESS.captures_iter(declaration).map(|c| c[1].to_string()));
        if !accessed.is_empty() {
            return accessed;
        }
    }

    type_members(content, &format!("{}Props", name))
}

/// Member names of `interface Name {..}` or `type Name = {..}` in `content`.
fn type_members(content: &str, name: &str) -> Vec<String> {
    let pattern = format!(
        r"(?:interface\s+{0}\b[^{{]*\{{|type\s+{0}\s*=\s*\{{)",
        regex::escape(name)
    );
    let Ok(decl) = Regex::new(&pattern) else {
        return Vec::new();
    };
    decl.find(content)
        .and_then(|m| brace_body(content, m.end() - 1))
        .map(member_names)
        .unwrap_or_default()
}

/// Names declared in a TypeScript type-literal body.
fn member_names(body: &str) -> Vec<String> {
    dedup(
        split_top_level(body, &[';', '\n', ','])
            .into_iter()
            .filter_map(|member| {
                let member = member.trim_start_matches("readonly ").trim();
                let name: String = member
                    .chars()
                    .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '$')
                    .collect();
                let rest = member[name.len()..].trim_start();
                if !name.is_empty() && (rest.starts_with(':') || rest.starts_with("?:")) {
                    Some(name)
                } else {
                    None
                }
            }),
    )
}

/// Vue single-file components.
pub fn vue_components(ws: &Workspace) -> Vec<Component> {
    ws.scan(VUE_GLOBS, |rel, content| {
        vec![Component::new(file_stem(rel), vue_props(content), rel)]
    })
}

pub(crate) fn vue_props(content: &str) -> Vec<String> {
    if let Some(caps) = DEFINE_PROPS_TYPED.captures(content) {
        let Some(m) = caps.get(1) else {
            return Vec::new();
        };
        return if m.as_str() == "{" {
            brace_body(content, m.start()).map(member_names).unwrap_or_default()
        } else {
            type_members(content, m.as_str())
        };
    }

    for pattern in [&*DEFINE_PROPS_CALL, &*OPTIONS_PROPS] {
        if let Some(caps) = pattern.captures(content) {
            let Some(m) = caps.get(1) else { continue };
            if m.as_str() == "[" {
                let list = content[m.end()..].split(']').next().unwrap_or("");
                return dedup(QUOTED.captures_iter(list).map(|c| c[1].to_string()));
            }
            return brace_body_after(content, m.start())
                .map(|body| {
                    dedup(split_top_level(body, &[',']).into_iter().filter_map(|entry| {
                        let key = entry.split(':').next().unwrap_or(entry).trim();
                        let key = key.trim_matches(&['\'', '"'][..]);
                        if !key.is_empty() && key.chars().all(|c| c.is_alphanumeric() || c == '_') {
                            Some(key.to_string())
                        } else {
                            None
                        }
                    }))
                })
                .unwrap_or_default();
        }
    }

    Vec::new()
}

/// Svelte components, excluding SvelteKit `+page`/`+layout` files.
pub fn svelte_components(ws: &Workspace) -> Vec<Component> {
    ws.scan(SVELTE_GLOBS, |rel, content| {
        let name = file_stem(rel);
        if name.starts_with('+') {
            return Vec::new();
        }
        vec![Component::new(name, svelte_props(content), rel)]
    })
}

pub(crate) fn svelte_props(content: &str) -> Vec<String> {
    let mut props: Vec<String> = EXPORT_LET.captures_iter(content).map(|c| c[1].to_string()).collect();
    for caps in RUNES_PROPS.captures_iter(content) {
        props.extend(identifier_list(&caps[1]));
    }
    dedup(props)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_dynamic_page() {
        let routes = next_file_routes("pages/users/[id].tsx", "export default function User() {}");
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].method, "GET");
        assert_eq!(routes[0].path, "/users/:id");
    }

    #[test]
    fn test_next_pages_special_files() {
        assert!(next_file_routes("pages/_app.tsx", "").is_empty());
        assert_eq!(next_file_routes("src/pages/index.tsx", "")[0].path, "/");
        let api = next_file_routes("pages/api/users/[...slug].ts", "");
        assert_eq!(api[0].method, "ANY");
        assert_eq!(api[0].path, "/api/users/:slug");
    }

    #[test]
    fn test_next_app_router() {
        let page = next_file_routes("app/(marketing)/blog/[slug]/page.tsx", "");
        assert_eq!(page[0].path, "/blog/:slug");

        let src = "export async function GET(req) {}\nexport const POST = handler;\n";
        let routes = next_file_routes("app/api/items/route.ts", src);
        let methods: Vec<&str> = routes.iter().map(|r| r.method.as_str()).collect();
        assert_eq!(methods, vec!["GET", "POST"]);
        assert_eq!(routes[0].path, "/api/items");
    }

    #[test]
    fn test_nuxt_routes() {
        assert_eq!(nuxt_file_routes("pages/posts/[id].vue", "")[0].path, "/posts/:id");
        let api = nuxt_file_routes("server/api/users/[id].get.ts", "");
        assert_eq!(api[0].method, "GET");
        assert_eq!(api[0].path, "/api/users/:id");
        let any = nuxt_file_routes("server/routes/health.ts", "");
        assert_eq!(any[0].method, "ANY");
        assert_eq!(any[0].path, "/health");
    }

    #[test]
    fn test_sveltekit_routes() {
        assert_eq!(svelte_file_routes("src/routes/+page.svelte", "")[0].path, "/");
        let page = svelte_file_routes("src/routes/blog/[slug]/+page.svelte", "");
        assert_eq!(page[0].path, "/blog/:slug");
        let matched = svelte_file_routes("src/routes/blog/[slug=word]/+page.svelte", "");
        assert_eq!(matched[0].path, "/blog/:slug");
        let api = svelte_file_routes(
            "src/routes/api/todos/+server.ts",
            "export async function GET() {}\nexport function DELETE() {}",
        );
        assert_eq!(api.len(), 2);
        assert_eq!(api[1].method, "DELETE");
    }

    #[test]
    fn test_client_router_tables() {
        let vue = r#"
import { createRouter } from 'vue-router'
const routes = [
  { path: '/', component: Home },
  { path: '/about', name: 'about', component: () => import('./About.vue') },
]
"#;
        let routes = router_table_routes("src/router/index.js", vue);
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].handler.as_deref(), Some("Home"));
        assert_eq!(routes[1].path, "/about");
        assert_eq!(routes[1].handler, None);

        let jsx = r#"<Routes><Route path="/users/:id" element={<UserPage />} /></Routes>"#;
        let routes = router_table_routes("src/App.tsx", jsx);
        assert_eq!(routes[0].path, "/users/:id");
        assert_eq!(routes[0].handler.as_deref(), Some("UserPage"));

        assert!(router_table_routes("config.js", "{ path: '/tmp' }").is_empty());
    }

    #[test]
    fn test_react_components() {
        let src = r#"
interface CardProps {
  title: string;
  subtitle?: string;
}

export function Card({ title, subtitle = "" }: CardProps) {
  return <div>{title}</div>;
}

export const Avatar = (props: AvatarProps) => <img src={props.url} alt={props.alt} />;

const Badge: React.FC<CardProps> = ({ label }) => <span>{label}</span>;

export default function Page(props: CardProps) {
  return <Card title="x" />;
}

class Legacy extends React.Component<LegacyProps> {
  render() { return <p>{this.props.text}</p>; }
}

function helper() {}
"#;
        let components = react_file_components("src/components/Card.tsx", src);
        let summary: Vec<(&str, Vec<&str>)> = components
            .iter()
            .map(|c| (c.name.as_str(), c.props.iter().map(String::as_str).collect()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Card", vec!["title", "subtitle"]),
                ("Avatar", vec!["url", "alt"]),
                ("Badge", vec!["label"]),
                ("Page", vec!["title", "subtitle"]),
                ("Legacy", vec!["text"]),
            ]
        );
    }

    #[test]
    fn test_vue_props_forms() {
        assert_eq!(
            vue_props("<script setup lang=\"ts\">\ndefineProps<{ title: string; count?: number }>()\n</script>"),
            vec!["title", "count"]
        );
        assert_eq!(vue_props("const p = defineProps(['a', 'b'])"), vec!["a", "b"]);
        assert_eq!(
            vue_props("defineProps({ msg: String, size: { type: Number, default: 1 } })"),
            vec!["msg", "size"]
        );
        assert_eq!(
            vue_props("export default { props: { user: Object }, data() { return {} } }"),
            vec!["user"]
        );
        assert!(vue_props("<template><p/></template>").is_empty());
    }

    #[test]
    fn test_svelte_props() {
        assert_eq!(svelte_props("<script>\n  export let name;\n  export let age = 3;\n</script>"), vec!["name", "age"]);
        assert_eq!(svelte_props("<script>\n  let { title, open = false } = $props();\n</script>"), vec!["title", "open"]);
    }
}
