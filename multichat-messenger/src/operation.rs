//! Operation registry and dispatch.
//!
//! Every backend describes its tools as [`Operation`]s: a unique name, a
//! description, a JSON schema derived from a typed parameter struct, and an
//! async handler. Operations are collected into a [`Namespace`] once at
//! startup; the protocol layer only ever talks to the namespace.
//!
//! Argument decoding is shared: the raw argument bag is decoded into the
//! operation's parameter type before the handler runs, and a decode failure is
//! reported as an `invalid arguments` failure without reaching the handler.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::{DeliveryError, ErrorKind, MessengerError, Result};

/// A JSON object, as carried by tool arguments and input schemas.
pub type JsonObject = serde_json::Map<String, Value>;

type BoxedHandler = Arc<dyn Fn(JsonObject) -> BoxFuture<'static, ToolOutput> + Send + Sync>;

// ============ ToolOutput ============

/// Result of one operation invocation: either success text or failure text.
///
/// Notes are advisory lines shown to the caller alongside the main text, such
/// as a capability gap on the active platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub is_error: bool,
    pub text: String,
    pub notes: Vec<String>,
    pub error_kind: Option<ErrorKind>,
}

impl ToolOutput {
    /// Plain success text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            is_error: false,
            text: text.into(),
            notes: Vec::new(),
            error_kind: None,
        }
    }

    /// Pretty-printed JSON success payload.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_string_pretty(value) {
            Ok(json) => Self::text(json),
            Err(e) => {
                log::error!("Failed to serialize tool result: {e}");
                Self::failure(ErrorKind::Transport, format!("failed to encode result: {e}"))
            }
        }
    }

    /// Failure with a custom message.
    pub fn failure(kind: ErrorKind, text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            text: text.into(),
            notes: Vec::new(),
            error_kind: Some(kind),
        }
    }

    /// Failure rendered straight from an error.
    pub fn error(error: &MessengerError) -> Self {
        Self::failure(error.kind(), error.to_string())
    }

    /// Failure rendered as `"{context}: {error}"`, logged by severity.
    pub fn failed(context: &str, error: &MessengerError) -> Self {
        if error.is_expected() {
            log::warn!("{context}: {error}");
        } else {
            log::error!("{context}: {error}");
        }
        Self::failure(error.kind(), format!("{context}: {error}"))
    }

    /// Map a backend result: success is JSON-encoded, failure goes through [`Self::failed`].
    pub fn from_result<T: Serialize>(context: &str, result: Result<T>) -> Self {
        match result {
            Ok(value) => Self::json(&value),
            Err(e) => Self::failed(context, &e),
        }
    }

    /// Map a send result. Failures carry the receipt as compact JSON:
    /// `"{context}: {error}\nDetails: {receipt}"`, with `null` when nothing was sent.
    pub fn from_delivery<R: Serialize>(
        context: &str,
        result: std::result::Result<R, DeliveryError<R>>,
    ) -> Self {
        match result {
            Ok(receipt) => Self::json(&receipt),
            Err(DeliveryError { error, receipt }) => {
                let details = serde_json::to_string(&receipt).unwrap_or_else(|_| "null".to_string());
                let mut output = Self::failed(context, &error);
                output.text = format!("{}\nDetails: {details}", output.text);
                output
            }
        }
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

// ============ Operation ============

/// Decode a raw argument bag into a typed parameter struct.
pub fn decode_args<P: DeserializeOwned>(args: JsonObject) -> Result<P> {
    serde_json::from_value(Value::Object(args))
        .map_err(|e| MessengerError::InvalidArguments(e.to_string()))
}

/// Build the input schema object for a parameter type.
pub fn input_schema_for<P: JsonSchema>() -> JsonObject {
    let schema = schemars::schema_for!(P);
    match serde_json::to_value(&schema) {
        Ok(Value::Object(mut object)) => {
            object.remove("$schema");
            object
                .entry("type")
                .or_insert_with(|| Value::String("object".to_string()));
            object
        }
        _ => {
            let mut object = JsonObject::new();
            object.insert("type".to_string(), Value::String("object".to_string()));
            object
        }
    }
}

/// One named tool with its schema and handler. Immutable after construction.
#[derive(Clone)]
pub struct Operation {
    name: String,
    description: String,
    input_schema: Arc<JsonObject>,
    handler: BoxedHandler,
}

impl Operation {
    /// Create an operation whose arguments decode into `P`.
    pub fn new<P, F, Fut>(name: impl Into<String>, description: impl Into<String>, handler: F) -> Self
    where
        P: JsonSchema + DeserializeOwned + Send + 'static,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolOutput> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let boxed: BoxedHandler = Arc::new(move |args: JsonObject| {
            let handler = Arc::clone(&handler);
            Box::pin(async move {
                match decode_args::<P>(args) {
                    Ok(params) => handler(params).await,
                    Err(e) => ToolOutput::error(&e),
                }
            })
        });

        Self {
            name: name.into(),
            description: description.into(),
            input_schema: Arc::new(input_schema_for::<P>()),
            handler: boxed,
        }
    }

    /// Like [`Self::new`], but hands each invocation a clone of `target`.
    pub fn with_target<T, P, F, Fut>(
        target: &Arc<T>,
        name: impl Into<String>,
        description: impl Into<String>,
        handler: F,
    ) -> Self
    where
        T: Send + Sync + ?Sized + 'static,
        P: JsonSchema + DeserializeOwned + Send + 'static,
        F: Fn(Arc<T>, P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolOutput> + Send + 'static,
    {
        let target = Arc::clone(target);
        Self::new(name, description, move |params: P| {
            handler(Arc::clone(&target), params)
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn input_schema(&self) -> Arc<JsonObject> {
        Arc::clone(&self.input_schema)
    }

    /// Run the handler, aborting with a `cancelled` failure if `ct` fires first.
    pub async fn invoke(&self, args: JsonObject, ct: &CancellationToken) -> ToolOutput {
        tokio::select! {
            biased;
            () = ct.cancelled() => {
                log::info!("Operation '{}' cancelled", self.name);
                ToolOutput::error(&MessengerError::Cancelled)
            }
            output = (self.handler)(args) => output,
        }
    }
}

impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

// ============ Namespace ============

/// The set of operations one backend exposes, in registration order.
#[derive(Debug, Default)]
pub struct Namespace {
    operations: Vec<Operation>,
    index: HashMap<String, usize>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operation. A name that is already taken is a configuration error.
    pub fn register(&mut self, operation: Operation) -> Result<()> {
        if self.index.contains_key(operation.name()) {
            return Err(MessengerError::DuplicateOperation(operation.name().to_string()));
        }
        log::debug!("Registered operation '{}'", operation.name());
        self.index
            .insert(operation.name().to_string(), self.operations.len());
        self.operations.push(operation);
        Ok(())
    }

    /// Exact-name lookup.
    pub fn get(&self, name: &str) -> Option<&Operation> {
        self.index.get(name).map(|&i| &self.operations[i])
    }

    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Invoke the operation called `name`. Returns `None` for an unknown name.
    pub async fn dispatch(
        &self,
        name: &str,
        args: JsonObject,
        ct: &CancellationToken,
    ) -> Option<ToolOutput> {
        let operation = self.get(name)?;
        Some(operation.invoke(args, ct).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct EchoParams {
        /// Text to echo back
        message: String,
        #[schemars(extend("default" = 20))]
        limit: Option<u32>,
    }

    fn echo_operation(counter: Arc<AtomicUsize>) -> Operation {
        Operation::new("echo", "Echo the message", move |p: EchoParams| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                ToolOutput::text(format!("{}:{}", p.message, p.limit.unwrap_or(20)))
            }
        })
    }

    fn args(value: serde_json::Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn dispatch_reaches_handler_exactly_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut ns = Namespace::new();
        ns.register(echo_operation(Arc::clone(&counter))).unwrap();

        let out = ns
            .dispatch(
                "echo",
                args(serde_json::json!({"message": "hi"})),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(!out.is_error);
        assert_eq!(out.text, "hi:20");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_name_is_none() {
        let ns = Namespace::new();
        let out = ns
            .dispatch("missing", JsonObject::new(), &CancellationToken::new())
            .await;
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn lookup_is_exact() {
        let mut ns = Namespace::new();
        ns.register(echo_operation(Arc::new(AtomicUsize::new(0))))
            .unwrap();
        assert!(ns.get("Echo").is_none());
        assert!(ns.get("echo ").is_none());
        assert!(ns.get("echo").is_some());
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut ns = Namespace::new();
        ns.register(echo_operation(Arc::new(AtomicUsize::new(0))))
            .unwrap();
        let err = ns
            .register(echo_operation(Arc::new(AtomicUsize::new(0))))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(ns.len(), 1);
    }

    #[tokio::test]
    async fn bad_arguments_skip_handler() {
        let counter = Arc::new(AtomicUsize::new(0));
        let op = echo_operation(Arc::clone(&counter));

        let out = op
            .invoke(args(serde_json::json!({"limit": 3})), &CancellationToken::new())
            .await;

        assert!(out.is_error);
        assert_eq!(out.error_kind, Some(ErrorKind::Argument));
        assert!(out.text.starts_with("invalid arguments:"));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancelled_token_aborts() {
        let op = Operation::new("slow", "Never finishes", |_: EchoParams| async {
            std::future::pending::<()>().await;
            ToolOutput::text("unreachable")
        });
        let ct = CancellationToken::new();
        ct.cancel();

        let out = op
            .invoke(args(serde_json::json!({"message": "x"})), &ct)
            .await;

        assert!(out.is_error);
        assert_eq!(out.error_kind, Some(ErrorKind::Cancelled));
    }

    #[test]
    fn schema_is_object_with_required_and_default() {
        let schema = input_schema_for::<EchoParams>();
        assert_eq!(schema.get("type").and_then(Value::as_str), Some("object"));
        assert!(!schema.contains_key("$schema"));

        let required = schema.get("required").and_then(Value::as_array).unwrap();
        assert!(required.iter().any(|v| v == "message"));
        assert!(!required.iter().any(|v| v == "limit"));

        let limit = &schema["properties"]["limit"];
        assert_eq!(limit["default"], 20);
        assert_eq!(
            schema["properties"]["message"]["description"],
            "Text to echo back"
        );
    }

    #[test]
    fn from_result_prefixes_context() {
        let out = ToolOutput::from_result::<()>(
            "search failed",
            Err(MessengerError::not_connected("WhatsApp")),
        );
        assert!(out.is_error);
        assert_eq!(out.text, "search failed: not connected to WhatsApp");
        assert_eq!(out.error_kind, Some(ErrorKind::State));
    }

    #[test]
    fn json_output_is_pretty() {
        let out = ToolOutput::json(&serde_json::json!({"a": 1}));
        assert_eq!(out.text, "{\n  \"a\": 1\n}");
    }

    #[test]
    fn delivery_failure_carries_details() {
        let out = ToolOutput::from_delivery(
            "failed to post tweet",
            Err(DeliveryError::with_receipt(
                MessengerError::transport("Twitter/X", "HTTP 403"),
                serde_json::json!({"success": false}),
            )),
        );
        assert!(out.is_error);
        assert_eq!(
            out.text,
            "failed to post tweet: [Twitter/X] HTTP 403\nDetails: {\"success\":false}"
        );

        let out = ToolOutput::from_delivery::<serde_json::Value>(
            "failed to send message",
            Err(MessengerError::not_connected("Teams").into()),
        );
        assert!(out.text.ends_with("Details: null"));
        assert_eq!(out.error_kind, Some(ErrorKind::State));
    }

    #[tokio::test]
    async fn with_target_shares_the_target() {
        let counter = Arc::new(AtomicUsize::new(0));
        let op = Operation::with_target(&counter, "bump", "Bump", |c, _p: EchoParams| async move {
            let n = c.fetch_add(1, Ordering::SeqCst) + 1;
            ToolOutput::text(n.to_string())
        });

        let ct = CancellationToken::new();
        op.invoke(args(serde_json::json!({"message": "x"})), &ct).await;
        let out = op.invoke(args(serde_json::json!({"message": "x"})), &ct).await;
        assert_eq!(out.text, "2");
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
