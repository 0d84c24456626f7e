//! Header names used on fabric requests. Lower-case so they can be used
//! with `HeaderName::from_static`; lookups are case-insensitive.

pub const TENANT_ID: &str = "x-xc-tenant-id";
pub const PUBLISHER: &str = "x-xc-publisher";
pub const PUBLISHER_PSEUDONYM: &str = "x-xc-publisher-pseudonym";
pub const MESSAGE_GUID: &str = "x-xc-message-guid";
pub const MESSAGE_GUID_CONTINUATION: &str = "x-xc-message-guid-continuation";
pub const DESTINATION_ID: &str = "x-xc-destination-id";
pub const IDEMPOTENCY_ID: &str = "x-xc-idempotency-id";
pub const SCHEMA_URI: &str = "x-xc-schema-uri";
pub const SCHEMA_VERSION: &str = "x-xc-schema-version";
pub const RESULT_CORRELATION_ID: &str = "x-xc-result-correlation-id";

/// Topics the fabric itself publishes to every tenant.
pub const SYSTEM_TOPICS: &[&str] = &[
    "/message/failed",
    "/xfabric/capability/endpoint/results",
    "/xfabric/tenant/updated",
    "/xfabric/topic/define/results",
    "/xfabric/topic/registration/results",
];
