// ABOUTME: Type definitions for API requests, per-operation validation schemas and response envelopes
// ABOUTME: Every request is checked field by field and turned into a typed service input

use axum::{
    extract::{FromRequest, FromRequestParts},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, FieldError};
use crate::links::{self_link_error, NewLink};
use crate::notes::{NewNote, NoteChanges, NoteOrder, NoteOrderField};
use crate::storage::{page_offset, Page, PageRequest};
use crate::tags::NewTag;
use crate::versioning::Edit;
use crate::workspaces::{NewWorkspace, WorkspaceChanges};

// Extractors that turn framework rejections into the error envelope

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Payload<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct PathParams<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct QueryParams<T>(pub T);

/// A request schema: checks every field, reports all failures at once, and
/// yields the validated service input.
pub trait Validate {
    type Output;

    fn validate(self) -> Result<Self::Output, AppError>;
}

#[derive(Default)]
struct Checks(Vec<FieldError>);

impl Checks {
    fn fail(&mut self, path: &str, message: impl Into<String>, code: &'static str) {
        self.0.push(FieldError::new(path, message, code));
    }

    fn invalid_type(&mut self, path: &str, expected: &str) {
        self.fail(path, format!("{} must be {}", path, expected), "invalid_type");
    }

    /// Drops JSON `null` so absent and null fields behave the same.
    fn optional(value: Option<Value>) -> Option<Value> {
        value.filter(|v| !v.is_null())
    }

    fn required(&mut self, path: &str, value: Option<Value>) -> Option<Value> {
        let value = Self::optional(value);
        if value.is_none() {
            self.fail(path, format!("{} is required", path), "required");
        }
        value
    }

    fn string(&mut self, path: &str, value: Option<Value>) -> Option<String> {
        match Self::optional(value)? {
            Value::String(s) => Some(s),
            _ => {
                self.invalid_type(path, "a string");
                None
            }
        }
    }

    fn integer(&mut self, path: &str, value: Option<Value>) -> Option<i64> {
        let value = Self::optional(value)?;
        match value.as_i64() {
            Some(n) => Some(n),
            None => {
                self.invalid_type(path, "an integer");
                None
            }
        }
    }

    fn boolean(&mut self, path: &str, value: Option<Value>) -> Option<bool> {
        match Self::optional(value)? {
            Value::Bool(b) => Some(b),
            _ => {
                self.invalid_type(path, "a boolean");
                None
            }
        }
    }

    fn uuid(&mut self, path: &str, value: Option<Value>) -> Option<Uuid> {
        let raw = self.string(path, value)?;
        match Uuid::parse_str(&raw) {
            Ok(id) => Some(id),
            Err(_) => {
                self.invalid_type(path, "a UUID");
                None
            }
        }
    }

    /// Trims and bounds a text field by character count.
    fn text(&mut self, path: &str, value: Option<String>, min: usize, max: usize) -> Option<String> {
        let value = value?.trim().to_string();
        let len = value.chars().count();
        if len < min {
            self.fail(path, format!("{} must not be empty", path), "too_short");
            None
        } else if len > max {
            self.fail(
                path,
                format!("{} must be at most {} characters", path, max),
                "too_long",
            );
            None
        } else {
            Some(value)
        }
    }

    fn non_negative(&mut self, path: &str, value: Option<i64>) -> Option<i64> {
        let value = value?;
        if value < 0 {
            self.fail(path, format!("{} must be zero or greater", path), "out_of_range");
            None
        } else {
            Some(value)
        }
    }

    /// Fails with every collected field error, or builds the output. `build`
    /// only runs once all checks passed, so a `None` there is a bug.
    fn finish<T>(self, build: impl FnOnce() -> Option<T>) -> Result<T, AppError> {
        if !self.0.is_empty() {
            return Err(AppError::Validation(self.0));
        }
        build().ok_or_else(|| AppError::Internal("validated input incomplete".to_string()))
    }
}

// Request bodies keep raw JSON per field so a wrong type on one field
// does not hide problems with the others.

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub name: Option<Value>,
}

impl Validate for CreateUserRequest {
    type Output = String;

    fn validate(self) -> Result<String, AppError> {
        let mut checks = Checks::default();
        let name = checks.required("name", self.name);
        let name = checks.string("name", name);
        let name = checks.text("name", name, 1, 100);
        checks.finish(|| name)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkspaceRequest {
    pub name: Option<Value>,
    pub description: Option<Value>,
}

impl Validate for CreateWorkspaceRequest {
    type Output = NewWorkspace;

    fn validate(self) -> Result<NewWorkspace, AppError> {
        let mut checks = Checks::default();
        let name = checks.required("name", self.name);
        let name = checks.string("name", name);
        let name = checks.text("name", name, 1, 100);
        let description = checks.string("description", self.description);
        let description = checks.text("description", description, 0, 1000);
        checks.finish(|| {
            Some(NewWorkspace {
                name: name?,
                description: description.filter(|d| !d.is_empty()),
            })
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkspaceRequest {
    pub name: Option<Value>,
    pub description: Option<Value>,
}

impl Validate for UpdateWorkspaceRequest {
    type Output = WorkspaceChanges;

    fn validate(self) -> Result<WorkspaceChanges, AppError> {
        let mut checks = Checks::default();
        if Checks::optional(self.name.clone()).is_none()
            && Checks::optional(self.description.clone()).is_none()
        {
            checks.fail("body", "at least one of name, description is required", "empty_update");
        }
        let name = checks.string("name", self.name);
        let name = checks.text("name", name, 1, 100);
        let description = checks.string("description", self.description);
        let description = checks.text("description", description, 0, 1000);
        checks.finish(|| {
            Some(WorkspaceChanges {
                name,
                // An empty description clears it, matching creation
                description: description.map(|d| Some(d).filter(|d| !d.is_empty())),
            })
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantPermissionRequest {
    pub user_id: Option<Value>,
    pub can_write: Option<Value>,
}

impl Validate for GrantPermissionRequest {
    type Output = (Uuid, bool);

    fn validate(self) -> Result<(Uuid, bool), AppError> {
        let mut checks = Checks::default();
        let user_id = checks.required("userId", self.user_id);
        let user_id = checks.uuid("userId", user_id);
        let can_write = checks.required("canWrite", self.can_write);
        let can_write = checks.boolean("canWrite", can_write);
        checks.finish(|| Some((user_id?, can_write?)))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest {
    pub title: Option<Value>,
    pub content: Option<Value>,
}

impl Validate for CreateNoteRequest {
    type Output = NewNote;

    fn validate(self) -> Result<NewNote, AppError> {
        let mut checks = Checks::default();
        let title = checks.required("title", self.title);
        let title = checks.string("title", title);
        let title = checks.text("title", title, 1, 255);
        let content = checks.string("content", self.content);
        checks.finish(|| {
            Some(NewNote {
                title: title?,
                content: content.unwrap_or_default(),
            })
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNoteRequest {
    pub title: Option<Value>,
    pub content: Option<Value>,
}

impl Validate for UpdateNoteRequest {
    type Output = NoteChanges;

    fn validate(self) -> Result<NoteChanges, AppError> {
        let mut checks = Checks::default();
        if Checks::optional(self.title.clone()).is_none()
            && Checks::optional(self.content.clone()).is_none()
        {
            checks.fail("body", "at least one of title, content is required", "empty_update");
        }
        let title = checks.string("title", self.title);
        let title = checks.text("title", title, 1, 255);
        let content = checks.string("content", self.content);
        checks.finish(|| Some(NoteChanges { title, content }))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyDiffRequest {
    pub position: Option<Value>,
    pub length: Option<Value>,
    pub new_text: Option<Value>,
    pub expected_version: Option<Value>,
}

impl Validate for ApplyDiffRequest {
    type Output = (Edit, Option<i32>);

    fn validate(self) -> Result<(Edit, Option<i32>), AppError> {
        let mut checks = Checks::default();
        let position = checks.required("position", self.position);
        let position = checks.integer("position", position);
        let position = checks.non_negative("position", position);
        let length = checks.integer("length", self.length);
        let length = checks.non_negative("length", length);
        let new_text = checks.required("newText", self.new_text);
        let new_text = checks.string("newText", new_text);
        let expected_version = checks.integer("expectedVersion", self.expected_version);
        let expected_version = match expected_version.map(i32::try_from) {
            Some(Ok(version)) => Some(version),
            Some(Err(_)) => {
                checks.fail("expectedVersion", "expectedVersion is out of range", "out_of_range");
                None
            }
            None => None,
        };
        checks.finish(|| {
            let edit = Edit {
                position: usize::try_from(position?).ok()?,
                length: usize::try_from(length.unwrap_or(0)).ok()?,
                new_text: new_text?,
            };
            Some((edit, expected_version))
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTagRequest {
    pub name: Option<Value>,
    pub display_name: Option<Value>,
}

impl Validate for CreateTagRequest {
    type Output = NewTag;

    fn validate(self) -> Result<NewTag, AppError> {
        let mut checks = Checks::default();
        let name = checks.required("name", self.name);
        let name = checks.string("name", name);
        let name = checks.text("name", name, 1, 64);
        let name = name.and_then(|name| {
            let valid = name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
            if !valid {
                checks.fail(
                    "name",
                    "name may only contain lowercase letters, digits, '-' and '_'",
                    "invalid_format",
                );
                return None;
            }
            Some(name)
        });
        let display_name = checks.string("displayName", self.display_name);
        let display_name = checks.text("displayName", display_name, 1, 100);
        checks.finish(|| {
            let name = name?;
            Some(NewTag {
                display_name: display_name.unwrap_or_else(|| name.clone()),
                name,
            })
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddNoteTagRequest {
    pub tag_id: Option<Value>,
}

impl Validate for AddNoteTagRequest {
    type Output = Uuid;

    fn validate(self) -> Result<Uuid, AppError> {
        let mut checks = Checks::default();
        let tag_id = checks.required("tagId", self.tag_id);
        let tag_id = checks.uuid("tagId", tag_id);
        checks.finish(|| tag_id)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLinkRequest {
    pub source_note_id: Option<Value>,
    pub target_note_id: Option<Value>,
    pub link_text: Option<Value>,
    pub position: Option<Value>,
}

impl Validate for CreateLinkRequest {
    type Output = NewLink;

    fn validate(self) -> Result<NewLink, AppError> {
        let mut checks = Checks::default();
        let source_note_id = checks.required("sourceNoteId", self.source_note_id);
        let source_note_id = checks.uuid("sourceNoteId", source_note_id);
        let target_note_id = checks.required("targetNoteId", self.target_note_id);
        let target_note_id = checks.uuid("targetNoteId", target_note_id);
        if source_note_id.is_some() && source_note_id == target_note_id {
            if let AppError::Validation(fields) = self_link_error() {
                checks.0.extend(fields);
            }
        }
        let link_text = checks.string("linkText", self.link_text);
        let link_text = checks.text("linkText", link_text, 0, 255);
        let position = checks.integer("position", self.position);
        let position = checks.non_negative("position", position);
        let position = position.and_then(|p| match i32::try_from(p) {
            Ok(p) => Some(p),
            Err(_) => {
                checks.fail("position", "position is too large", "out_of_range");
                None
            }
        });
        checks.finish(|| {
            Some(NewLink {
                source_note_id: source_note_id?,
                target_note_id: target_note_id?,
                link_text: link_text.unwrap_or_default(),
                position: position.unwrap_or(0),
            })
        })
    }
}

/// Query parameters arrive as text and are parsed per field, like bodies.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub order_by: Option<String>,
    pub order_dir: Option<String>,
}

impl ListQuery {
    pub fn page_request(&self, config: &Config) -> Result<PageRequest, AppError> {
        let mut checks = Checks::default();
        let page = parse_number(&mut checks, "page", self.page.as_deref()).unwrap_or(1);
        let limit = parse_number(&mut checks, "limit", self.limit.as_deref())
            .unwrap_or(config.default_page_limit as i64);

        if page < 1 {
            checks.fail("page", "page must be 1 or greater", "out_of_range");
        }
        let limit_ok = limit >= 1 && limit as u64 <= config.max_page_limit;
        if !limit_ok {
            checks.fail(
                "limit",
                format!("limit must be between 1 and {}", config.max_page_limit),
                "out_of_range",
            );
        }
        if page >= 1 && limit_ok {
            let request = PageRequest {
                page: page as u64,
                limit: limit as u64,
            };
            if page_offset(request).is_none() {
                checks.fail(
                    "page",
                    format!("page is too large for a limit of {}", limit),
                    "out_of_range",
                );
            }
        }

        checks.finish(|| {
            Some(PageRequest {
                page: page as u64,
                limit: limit as u64,
            })
        })
    }

    pub fn note_order(&self) -> Result<NoteOrder, AppError> {
        let mut checks = Checks::default();
        let defaults = NoteOrder::default();
        let field = match self.order_by.as_deref() {
            None => Some(defaults.field),
            Some(raw) => NoteOrderField::parse(raw).or_else(|| {
                checks.fail(
                    "orderBy",
                    format!("orderBy must be one of {}", NoteOrderField::ACCEPTED),
                    "invalid_value",
                );
                None
            }),
        };
        let descending = match self.order_dir.as_deref().map(str::to_ascii_lowercase).as_deref() {
            None => Some(defaults.descending),
            Some("desc") => Some(true),
            Some("asc") => Some(false),
            Some(_) => {
                checks.fail("orderDir", "orderDir must be asc or desc", "invalid_value");
                None
            }
        };
        checks.finish(|| {
            Some(NoteOrder {
                field: field?,
                descending: descending?,
            })
        })
    }
}

fn parse_number(checks: &mut Checks, path: &str, raw: Option<&str>) -> Option<i64> {
    match raw?.trim().parse() {
        Ok(n) => Some(n),
        Err(_) => {
            checks.invalid_type(path, "an integer");
            None
        }
    }
}

// Response envelopes

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }

    pub fn created(data: T) -> Response {
        (StatusCode::CREATED, Self::ok(data)).into_response()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub success: bool,
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T: Serialize> From<Page<T>> for PaginatedResponse<T> {
    fn from(page: Page<T>) -> Self {
        let pagination = PaginationMeta {
            page: page.page,
            limit: page.limit,
            total: page.total,
            total_pages: page.total_pages,
            has_next: page.has_next(),
            has_prev: page.has_prev(),
        };
        Self {
            success: true,
            data: page.items,
            pagination,
        }
    }
}

impl<T: Serialize> IntoResponse for PaginatedResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredUser<U> {
    pub user: U,
    /// Shown once; only the server-side copy remains afterwards.
    pub api_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse<T: serde::de::DeserializeOwned>(body: Value) -> T {
        serde_json::from_value(body).unwrap()
    }

    fn fields(err: AppError) -> Vec<FieldError> {
        match err {
            AppError::Validation(fields) => fields,
            other => panic!("expected validation error, got {other}"),
        }
    }

    fn paths(err: AppError) -> Vec<String> {
        fields(err).into_iter().map(|f| f.path).collect()
    }

    #[test]
    fn create_note_requires_title() {
        let err = parse::<CreateNoteRequest>(json!({"content": "body"}))
            .validate()
            .unwrap_err();
        assert_eq!(paths(err), vec!["title"]);

        let note = parse::<CreateNoteRequest>(json!({"title": "  Draft ", "content": null}))
            .validate()
            .unwrap();
        assert_eq!(note.title, "Draft");
        assert_eq!(note.content, "");
    }

    #[test]
    fn wrong_types_are_reported_per_field() {
        let err = parse::<CreateWorkspaceRequest>(json!({"name": 5, "description": 7}))
            .validate()
            .unwrap_err();
        let fields = fields(err);
        let reported: Vec<(&str, &str)> = fields
            .iter()
            .map(|f| (f.path.as_str(), f.code))
            .collect();
        assert_eq!(
            reported,
            vec![("name", "invalid_type"), ("description", "invalid_type")]
        );

        let err = parse::<GrantPermissionRequest>(json!({"userId": "nope", "canWrite": "yes"}))
            .validate()
            .unwrap_err();
        assert_eq!(paths(err), vec!["userId", "canWrite"]);
    }

    #[test]
    fn diff_reports_every_bad_field() {
        let err = parse::<ApplyDiffRequest>(json!({"position": -1, "length": -2}))
            .validate()
            .unwrap_err();
        assert_eq!(paths(err), vec!["position", "length", "newText"]);

        let err = parse::<ApplyDiffRequest>(json!({
            "position": "3",
            "length": 1.5,
            "newText": 9,
            "expectedVersion": 4_294_967_296_i64
        }))
        .validate()
        .unwrap_err();
        assert_eq!(
            paths(err),
            vec!["position", "length", "newText", "expectedVersion"]
        );
    }

    #[test]
    fn diff_length_defaults_to_insert() {
        let (edit, expected) =
            parse::<ApplyDiffRequest>(json!({"position": 3, "newText": "", "expectedVersion": 4}))
                .validate()
                .unwrap();
        assert_eq!(edit.position, 3);
        assert_eq!(edit.length, 0);
        assert_eq!(edit.new_text, "");
        assert_eq!(expected, Some(4));
    }

    #[test]
    fn link_to_self_is_invalid() {
        let id = Uuid::new_v4().to_string();
        let err = parse::<CreateLinkRequest>(json!({"sourceNoteId": id, "targetNoteId": id}))
            .validate()
            .unwrap_err();
        assert_eq!(paths(err), vec!["targetNoteId"]);
    }

    #[test]
    fn tag_names_are_restricted() {
        let err = parse::<CreateTagRequest>(json!({"name": "Has Spaces"}))
            .validate()
            .unwrap_err();
        assert_eq!(paths(err), vec!["name"]);

        let tag = parse::<CreateTagRequest>(json!({"name": "rust-lang"}))
            .validate()
            .unwrap();
        assert_eq!(tag.display_name, "rust-lang");
    }

    #[test]
    fn empty_updates_are_rejected() {
        let err = parse::<UpdateNoteRequest>(json!({})).validate().unwrap_err();
        assert_eq!(paths(err), vec!["body"]);

        let err = parse::<UpdateWorkspaceRequest>(json!({"name": null}))
            .validate()
            .unwrap_err();
        assert_eq!(paths(err), vec!["body"]);
    }

    #[test]
    fn empty_description_clears_on_update() {
        let changes = parse::<UpdateWorkspaceRequest>(json!({"description": "  "}))
            .validate()
            .unwrap();
        assert_eq!(changes.name, None);
        assert_eq!(changes.description, Some(None));

        let changes = parse::<UpdateWorkspaceRequest>(json!({"description": "Team notes"}))
            .validate()
            .unwrap();
        assert_eq!(changes.description, Some(Some("Team notes".to_string())));
    }

    #[test]
    fn list_query_bounds() {
        let config = Config::default();
        let request = ListQuery::default().page_request(&config).unwrap();
        assert_eq!(request, PageRequest { page: 1, limit: 20 });

        let err = ListQuery {
            page: Some("0".to_string()),
            limit: Some("1000".to_string()),
            ..ListQuery::default()
        }
        .page_request(&config)
        .unwrap_err();
        assert_eq!(paths(err), vec!["page", "limit"]);

        let err = ListQuery {
            page: Some("two".to_string()),
            ..ListQuery::default()
        }
        .page_request(&config)
        .unwrap_err();
        assert_eq!(fields(err)[0].code, "invalid_type");
    }

    #[test]
    fn list_query_rejects_unaddressable_pages() {
        let config = Config::default();
        let err = ListQuery {
            page: Some(i64::MAX.to_string()),
            limit: Some("100".to_string()),
            ..ListQuery::default()
        }
        .page_request(&config)
        .unwrap_err();
        let fields = fields(err);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].path, "page");
        assert_eq!(fields[0].code, "out_of_range");

        let request = ListQuery {
            page: Some("1000000".to_string()),
            limit: Some("100".to_string()),
            ..ListQuery::default()
        }
        .page_request(&config)
        .unwrap();
        assert_eq!(request.page, 1_000_000);
    }

    #[test]
    fn list_query_order() {
        let order = ListQuery {
            order_by: Some("title".to_string()),
            order_dir: Some("ASC".to_string()),
            ..ListQuery::default()
        }
        .note_order()
        .unwrap();
        assert_eq!(order.field, NoteOrderField::Title);
        assert!(!order.descending);

        let err = ListQuery {
            order_by: Some("content".to_string()),
            order_dir: Some("sideways".to_string()),
            ..ListQuery::default()
        }
        .note_order()
        .unwrap_err();
        assert_eq!(paths(err), vec!["orderBy", "orderDir"]);
    }
}
