//! Route declaration patterns, one rule per framework idiom.
//!
//! Every pattern captures the endpoint in a `path` group and, for
//! [`VerbSpec::Captured`] rules, the verb in a `verb` group. Patterns are
//! matched line-anchored with `[ \t]*` so they never swallow blank lines.

use crate::knowledge::ontology::{ApiType, HttpMethod, Language};

/// Version of the built-in rule table. Bump when a pattern changes.
pub const API_RULES_VERSION: &str = "api-v1";

/// How many lines below a route declaration its handler may start.
pub const HANDLER_WINDOW: u32 = 5;

/// Where a rule's verb comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbSpec {
    /// The `verb` capture group.
    Captured,
    /// Always this verb.
    Fixed(HttpMethod),
    /// A `methods=[...]` list or `RequestMethod.X` on the same line, else the default.
    MethodsList(HttpMethod),
}

/// A route detection rule.
#[derive(Debug, Clone, Copy)]
pub struct RouteRule {
    pub name: &'static str,
    pub languages: &'static [Language],
    pub pattern: &'static str,
    pub verb: VerbSpec,
    pub api_type: ApiType,
}

const JS: &[Language] = &[Language::JavaScript, Language::TypeScript];

pub const ROUTE_RULES: &[RouteRule] = &[
    // FastAPI / Flask 2 style: @app.get("/p"), @router.post("/p")
    RouteRule {
        name: "python-decorator-verb",
        languages: &[Language::Python],
        pattern: r#"(?m)^[ \t]*@\w+(?:\.\w+)*\.(?P<verb>get|post|put|patch|delete|head|options)\(\s*[rbuf]?["'](?P<path>[^"']*)["']"#,
        verb: VerbSpec::Captured,
        api_type: ApiType::Rest,
    },
    // Flask: @app.route("/p", methods=["GET", "POST"])
    RouteRule {
        name: "python-route",
        languages: &[Language::Python],
        pattern: r#"(?m)^[ \t]*@\w+(?:\.\w+)*\.route\(\s*[rbuf]?["'](?P<path>[^"']*)["'][^\n]*"#,
        verb: VerbSpec::MethodsList(HttpMethod::Get),
        api_type: ApiType::Rest,
    },
    RouteRule {
        name: "python-websocket",
        languages: &[Language::Python],
        pattern: r#"(?m)^[ \t]*@\w+(?:\.\w+)*\.websocket(?:_route)?\(\s*[rbuf]?["'](?P<path>[^"']*)["']"#,
        verb: VerbSpec::Fixed(HttpMethod::Ws),
        api_type: ApiType::WebSocket,
    },
    // Express: app.get('/p', ...), router.post(`/p`, ...)
    RouteRule {
        name: "express",
        languages: JS,
        pattern: r#"\b(?:app|router|server|api)\.(?P<verb>get|post|put|patch|delete|head|options|all)\(\s*["'`](?P<path>[^"'`]*)["'`]"#,
        verb: VerbSpec::Captured,
        api_type: ApiType::Rest,
    },
    // NestJS: @Get(':id'), @Post()
    RouteRule {
        name: "nestjs",
        languages: &[Language::TypeScript],
        pattern: r#"(?m)^[ \t]*@(?P<verb>Get|Post|Put|Patch|Delete|Head|Options|All)\(\s*(?:["'`](?P<path>[^"'`]*)["'`])?\s*\)"#,
        verb: VerbSpec::Captured,
        api_type: ApiType::Rest,
    },
    // Spring: @GetMapping("/p"), @PostMapping(value = "/p")
    RouteRule {
        name: "spring-verb-mapping",
        languages: &[Language::Java],
        pattern: r#"(?m)^[ \t]*@(?P<verb>Get|Post|Put|Patch|Delete)Mapping\b(?:\(\s*(?:(?:value|path)\s*=\s*)?\{?\s*"(?P<path>[^"]*)")?"#,
        verb: VerbSpec::Captured,
        api_type: ApiType::Rest,
    },
    // Spring: @RequestMapping(value = "/p", method = RequestMethod.POST)
    RouteRule {
        name: "spring-request-mapping",
        languages: &[Language::Java],
        pattern: r#"(?m)^[ \t]*@RequestMapping\b(?:\(\s*(?:(?:value|path)\s*=\s*)?\{?\s*"(?P<path>[^"]*)")?[^\n]*"#,
        verb: VerbSpec::MethodsList(HttpMethod::Any),
        api_type: ApiType::Rest,
    },
    // net/http: http.HandleFunc("/p", h), mux.Handle("/p", h)
    RouteRule {
        name: "go-handlefunc",
        languages: &[Language::Go],
        pattern: r#"\b\w+\.(?:HandleFunc|Handle)\(\s*"(?P<path>[^"]*)""#,
        verb: VerbSpec::Fixed(HttpMethod::Any),
        api_type: ApiType::Rest,
    },
    // gin / echo: r.GET("/p", h)
    RouteRule {
        name: "go-router-verb",
        languages: &[Language::Go],
        pattern: r#"\b\w+\.(?P<verb>GET|POST|PUT|PATCH|DELETE|HEAD|OPTIONS|Any)\(\s*"(?P<path>[^"]*)""#,
        verb: VerbSpec::Captured,
        api_type: ApiType::Rest,
    },
    // actix-web / rocket: #[get("/p")]
    RouteRule {
        name: "rust-route-attribute",
        languages: &[Language::Rust],
        pattern: r#"(?m)^[ \t]*#\[(?P<verb>get|post|put|patch|delete|head|options)\(\s*"(?P<path>[^"]*)""#,
        verb: VerbSpec::Captured,
        api_type: ApiType::Rest,
    },
    // axum: .route("/p", get(handler))
    RouteRule {
        name: "axum-route",
        languages: &[Language::Rust],
        pattern: r#"\.route\(\s*"(?P<path>[^"]*)"\s*,\s*(?:\w+::)*(?P<verb>get|post|put|patch|delete|head|options|any)\("#,
        verb: VerbSpec::Captured,
        api_type: ApiType::Rest,
    },
];

/// Verb list inside a Flask `methods=[...]` argument.
pub const METHODS_LIST_PATTERN: &str = r#"methods\s*=\s*[\[(](?P<list>[^\])]*)[\])]"#;

/// Spring `RequestMethod.X` reference.
pub const REQUEST_METHOD_PATTERN: &str = r"RequestMethod\.(?P<verb>[A-Z]+)";
