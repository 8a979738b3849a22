//! API entity nodes: endpoints found in route declarations.

use serde::{Deserialize, Serialize};

// =============================================================================
// API ENTITY
// =============================================================================

/// An endpoint declaration.
///
/// Identity is `(file_path, method, endpoint)`. Detection is syntactic; the
/// endpoint path is recorded exactly as written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEntity {
    /// Unique identifier
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,

    /// Endpoint path (e.g., "/api/v1/users/{id}")
    pub endpoint: String,

    /// HTTP verb or transport marker
    pub method: HttpMethod,

    /// Transport type
    pub api_type: ApiType,

    /// File containing the declaration
    pub file_path: String,

    /// Line number of the declaration
    pub line: u32,

    /// Qualified name of the function declared right after the route, if any
    pub handler: Option<String>,

    /// Name of the detection rule that matched
    pub rule: String,
}

/// HTTP method or transport marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    /// Route registered for every method
    Any,
    /// WebSocket upgrade endpoint
    Ws,
}

impl HttpMethod {
    /// Parse a verb name, case-insensitive. `all` and `route` mean [`HttpMethod::Any`].
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            "HEAD" => Some(Self::Head),
            "OPTIONS" => Some(Self::Options),
            "ANY" | "ALL" | "ROUTE" | "HANDLE" | "HANDLEFUNC" => Some(Self::Any),
            "WS" | "WEBSOCKET" => Some(Self::Ws),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Any => "ANY",
            Self::Ws => "WS",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// API transport type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApiType {
    #[default]
    Rest,
    WebSocket,
}
