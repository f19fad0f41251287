use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

use super::error::GatewayError;
use crate::constants::{
    RPC_METHOD_AUTHENTICATE, RPC_METHOD_GET, TYPE_DEVICE, TYPE_DEVICE_STATUS_INFO, TYPE_GROUP,
};
use crate::models::{Credentials, EntityRef, GroupId};

/// Body of every POST: `{ "method": ..., "params": ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub method: String,
    pub params: Value,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    pub fn authenticate(database: &str, user_name: &str, password: &str) -> Self {
        Self::new(
            RPC_METHOD_AUTHENTICATE,
            json!({
                "database": database,
                "userName": user_name,
                "password": password,
            }),
        )
    }

    pub fn get(query: &EntityQuery, credentials: &Credentials) -> Self {
        Self::new(
            RPC_METHOD_GET,
            json!({
                "typeName": query.type_name,
                "search": query.search,
                "credentials": credentials,
            }),
        )
    }

    /// Credentials echoed in the params, if any
    pub fn credentials(&self) -> Option<&Value> {
        self.params.get("credentials")
    }
}

/// Reply envelope: `{ "result": ... }` or `{ "error": { "message": ... } }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    /// `None` only when the key is absent; `"result": null` is `Some(Null)`
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorBody>,
}

fn present_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl RpcResponse {
    pub fn success(result: Value) -> Self {
        Self {
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(RpcErrorBody {
                message: message.into(),
                ..Default::default()
            }),
        }
    }

    /// Split the envelope into its result or a classified error.
    /// An error payload wins over a result if a server sends both.
    pub fn into_result(self) -> Result<Value, GatewayError> {
        match (self.result, self.error) {
            (_, Some(error)) => Err(GatewayError::Application {
                name: error.error_name().map(str::to_string),
                message: error.message,
            }),
            (Some(result), None) => Ok(result),
            (None, None) => Err(GatewayError::Malformed(
                "response has neither result nor error".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<RpcErrorDetail>,
}

impl RpcErrorBody {
    /// Most specific exception name in the payload: inner errors first, then
    /// `data.type`, then the top-level name
    pub fn error_name(&self) -> Option<&str> {
        self.errors
            .iter()
            .find_map(|detail| detail.name.as_deref())
            .or_else(|| {
                self.data
                    .as_ref()
                    .and_then(|data| data.get("type"))
                    .and_then(Value::as_str)
            })
            .or(self.name.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorDetail {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A `Get` query: entity type plus search object
#[derive(Debug, Clone, PartialEq)]
pub struct EntityQuery {
    pub type_name: String,
    pub search: Value,
}

impl EntityQuery {
    pub fn new(type_name: impl Into<String>, search: Value) -> Self {
        Self {
            type_name: type_name.into(),
            search,
        }
    }

    pub fn group(group_id: &GroupId) -> Self {
        Self::new(
            TYPE_GROUP,
            json!({ "includeAllTrees": false, "id": group_id }),
        )
    }

    pub fn devices_in_groups(groups: &[GroupId]) -> Self {
        Self::new(TYPE_DEVICE, json!({ "groups": group_refs(groups) }))
    }

    pub fn device_by_id(id: &str) -> Self {
        Self::new(TYPE_DEVICE, json!({ "id": id }))
    }

    pub fn status_in_groups(groups: &[GroupId]) -> Self {
        Self::new(
            TYPE_DEVICE_STATUS_INFO,
            json!({ "deviceSearch": { "groups": group_refs(groups) } }),
        )
    }
}

fn group_refs(groups: &[GroupId]) -> Vec<EntityRef> {
    groups.iter().map(EntityRef::from).collect()
}
