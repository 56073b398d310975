//! Write tools
//!
//! Tools that create, update or delete configuration objects upstream. They
//! are tagged as write tools, so the dispatcher only runs them on sessions
//! whose write access was unlocked, and asks for consent first when the
//! unlock came from the client's elicitation support.

use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;
use uuid::Uuid;

use super::passthrough::call_upstream;
use crate::mcp::context::ToolContext;
use crate::mcp::protocol::McpError;
use crate::mcp::registry::{McpRegistry, RegisteredTool, ToolBuilder, ToolResult};

pub const UPDATE_SITE_OBJECTS_NAME: &str = "updateSiteConfigurationObjects";
pub const CHANGE_ORG_OBJECTS_NAME: &str = "changeOrgConfigurationObjects";

const SITE_OBJECT_TYPES: &[&str] = &[
    "devices",
    "evpn_topologies",
    "psks",
    "webhooks",
    "wlans",
    "wxrules",
    "wxtags",
];

const ORG_OBJECT_TYPES: &[&str] = &[
    "alarmtemplates",
    "wlans",
    "sitegroups",
    "avprofiles",
    "deviceprofiles",
    "gatewaytemplates",
    "idpprofiles",
    "aamwprofiles",
    "nactags",
    "nacrules",
    "networktemplates",
    "networks",
    "psks",
    "rftemplates",
    "services",
    "servicepolicies",
    "sitetemplates",
    "vpns",
    "webhooks",
    "wlantemplates",
    "wxrules",
    "wxtags",
];

/// Register write tools with the registry
pub fn register_tools(registry: &mut McpRegistry) {
    registry.register_tool(update_site_objects_tool());
    registry.register_tool(change_org_objects_tool());
}

// ============================================================================
// Argument parsing
// ============================================================================

fn parse_uuid(field: &str, raw: &str) -> Result<Uuid, McpError> {
    Uuid::parse_str(raw.trim())
        .map_err(|e| McpError::InvalidParams(format!("{} must be a UUID: {}", field, e)))
}

fn parse_optional_uuid(field: &str, raw: Option<&str>) -> Result<Option<Uuid>, McpError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => parse_uuid(field, raw).map(Some),
        None => Ok(None),
    }
}

fn check_object_type(raw: &str, allowed: &[&str]) -> Result<String, McpError> {
    let object_type = raw.trim().to_ascii_lowercase();
    if allowed.contains(&object_type.as_str()) {
        Ok(object_type)
    } else {
        Err(McpError::InvalidParams(format!(
            "object_type must be one of: {}",
            allowed.join(", ")
        )))
    }
}

fn object_type_schema(allowed: &[&str], description: &str) -> Value {
    json!({
        "type": "string",
        "enum": allowed,
        "description": description
    })
}

// ============================================================================
// updateSiteConfigurationObjects
// ============================================================================

#[derive(Debug, Deserialize)]
struct SiteObjectsParams {
    site_id: String,
    object_type: String,
    payload: Map<String, Value>,
    #[serde(default)]
    object_id: Option<String>,
}

#[derive(Debug)]
struct SiteObjectChange {
    site_id: Uuid,
    object_type: String,
    payload: Map<String, Value>,
    object_id: Option<Uuid>,
}

impl SiteObjectChange {
    fn parse(params: &Value) -> Result<Self, McpError> {
        let params: SiteObjectsParams = serde_json::from_value(params.clone())
            .map_err(|e| McpError::InvalidParams(e.to_string()))?;
        Ok(Self {
            site_id: parse_uuid("site_id", &params.site_id)?,
            object_type: check_object_type(&params.object_type, SITE_OBJECT_TYPES)?,
            payload: params.payload,
            object_id: parse_optional_uuid("object_id", params.object_id.as_deref())?,
        })
    }

    fn action(&self) -> &'static str {
        if self.object_id.is_some() {
            "update"
        } else {
            "create"
        }
    }
}

fn site_objects_prompt(params: &Value) -> Result<String, McpError> {
    let change = SiteObjectChange::parse(params)?;
    let status = if change.object_id.is_some() {
        "an existing"
    } else {
        "a new"
    };
    Ok(format!(
        "The LLM wants to {} {} {}. Do you accept to trigger the API call?",
        change.action(),
        status,
        change.object_type
    ))
}

fn update_site_objects_tool() -> RegisteredTool {
    ToolBuilder::new(UPDATE_SITE_OBJECTS_NAME)
        .description(
            "Update or create configuration object for a specified site. IMPORTANT: to avoid \
             dropping required attributes, first retrieve the current object with \
             `getSiteConfigurationObjects` or `getSiteConfiguration`, modify the desired \
             attributes, then use this tool with the modified object. When creating a new \
             object, include all required attributes in the payload.",
        )
        .input_schema(json!({
            "type": "object",
            "properties": {
                "site_id": {
                    "type": "string",
                    "format": "uuid",
                    "description": "ID of the site to update configuration objects for."
                },
                "object_type": object_type_schema(
                    SITE_OBJECT_TYPES,
                    "Type of configuration object to update."
                ),
                "payload": {
                    "type": "object",
                    "description": "JSON payload of the configuration object to update or create."
                },
                "object_id": {
                    "type": "string",
                    "format": "uuid",
                    "description": "ID of the configuration object to update. If not provided, a new configuration object is created."
                }
            },
            "required": ["site_id", "object_type", "payload"]
        }))
        .write(site_objects_prompt)
        .build(update_site_objects_handler)
}

async fn update_site_objects_handler(ctx: ToolContext, params: Value) -> ToolResult {
    let change = SiteObjectChange::parse(&params)?;
    info!(
        "Session {} runs {} of site {} {}",
        ctx.session_id(),
        change.action(),
        change.object_type,
        change.site_id
    );

    let arguments = json!({
        "action_type": change.action(),
        "site_id": change.site_id.to_string(),
        "object_type": change.object_type,
        "object_id": change.object_id.map(|id| id.to_string()),
        "payload": change.payload,
    });
    call_upstream(&ctx, UPDATE_SITE_OBJECTS_NAME, arguments).await
}

// ============================================================================
// changeOrgConfigurationObjects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum OrgAction {
    Create,
    Update,
    Delete,
}

impl OrgAction {
    fn as_str(&self) -> &'static str {
        match self {
            OrgAction::Create => "create",
            OrgAction::Update => "update",
            OrgAction::Delete => "delete",
        }
    }

    fn wording(&self) -> &'static str {
        match self {
            OrgAction::Create => "create a new",
            OrgAction::Update => "update an existing",
            OrgAction::Delete => "delete an existing",
        }
    }
}

#[derive(Debug, Deserialize)]
struct OrgObjectsParams {
    action_type: OrgAction,
    org_id: String,
    object_type: String,
    #[serde(default)]
    payload: Option<Map<String, Value>>,
    #[serde(default)]
    object_id: Option<String>,
}

#[derive(Debug)]
struct OrgObjectChange {
    action: OrgAction,
    org_id: Uuid,
    object_type: String,
    payload: Map<String, Value>,
    object_id: Option<Uuid>,
}

impl OrgObjectChange {
    fn parse(params: &Value) -> Result<Self, McpError> {
        let params: OrgObjectsParams = serde_json::from_value(params.clone())
            .map_err(|e| McpError::InvalidParams(e.to_string()))?;
        let object_id = parse_optional_uuid("object_id", params.object_id.as_deref())?;
        if params.action_type != OrgAction::Create && object_id.is_none() {
            return Err(McpError::InvalidParams(format!(
                "object_id parameter is required when action_type is '{}'.",
                params.action_type.as_str()
            )));
        }
        let payload = match (params.payload, params.action_type) {
            (Some(payload), _) => payload,
            (None, OrgAction::Delete) => Map::new(),
            (None, _) => {
                return Err(McpError::InvalidParams(
                    "payload is required when creating or updating an object".to_string(),
                ))
            }
        };

        Ok(Self {
            action: params.action_type,
            org_id: parse_uuid("org_id", &params.org_id)?,
            object_type: check_object_type(&params.object_type, ORG_OBJECT_TYPES)?,
            payload,
            object_id,
        })
    }
}

fn org_objects_prompt(params: &Value) -> Result<String, McpError> {
    let change = OrgObjectChange::parse(params)?;
    Ok(format!(
        "The LLM wants to {} {}. Do you accept to trigger the API call?",
        change.action.wording(),
        change.object_type
    ))
}

fn change_org_objects_tool() -> RegisteredTool {
    ToolBuilder::new(CHANGE_ORG_OBJECTS_NAME)
        .description(
            "Update, create or delete configuration object for a specified org. IMPORTANT: \
             when updating, first retrieve the current object with `getOrgConfigurationObjects` \
             and send it back with the modified attributes. When deleting a WLAN Template, delete \
             the WLANs using it first. When creating a WLAN, set `template_id` in the payload to \
             an existing WLAN Template.",
        )
        .input_schema(json!({
            "type": "object",
            "properties": {
                "action_type": {
                    "type": "string",
                    "enum": ["create", "update", "delete"],
                    "description": "Whether the action creates a new object, updates an existing one, or deletes an existing one. object_id is required for update and delete."
                },
                "org_id": {
                    "type": "string",
                    "format": "uuid",
                    "description": "Organization ID"
                },
                "object_type": object_type_schema(
                    ORG_OBJECT_TYPES,
                    "Type of configuration object to create, update, or delete"
                ),
                "payload": {
                    "type": "object",
                    "description": "JSON payload of the configuration object to update or create."
                },
                "object_id": {
                    "type": "string",
                    "format": "uuid",
                    "description": "ID of the configuration object. Required when action_type is 'update' or 'delete'."
                }
            },
            "required": ["action_type", "org_id", "object_type"]
        }))
        .write(org_objects_prompt)
        .build(change_org_objects_handler)
}

async fn change_org_objects_handler(ctx: ToolContext, params: Value) -> ToolResult {
    let change = OrgObjectChange::parse(&params)?;
    info!(
        "Session {} runs {} of org {} {}",
        ctx.session_id(),
        change.action.as_str(),
        change.object_type,
        change.org_id
    );

    let arguments = json!({
        "action_type": change.action.as_str(),
        "org_id": change.org_id.to_string(),
        "object_type": change.object_type,
        "object_id": change.object_id.map(|id| id.to_string()),
        "payload": change.payload,
    });
    call_upstream(&ctx, CHANGE_ORG_OBJECTS_NAME, arguments).await
}
