//! Settings resolver for the Lambda fleet.
//!
//! Merges four precedence tiers (builder arguments > environment variables >
//! terraform.tfvars > hardcoded defaults) into one immutable [`Settings`]
//! object, validates every field during a single construction pass, and hands
//! out lazily-constructed AWS clients keyed off the resolved profile and
//! region.

use std::path::PathBuf;
use std::sync::{LazyLock, OnceLock};

use aws_config::{BehaviorVersion, Region, SdkConfig};
use regex::Regex;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use validator::Validate;

use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::project;
use crate::secret::{SecretSource, SecretString};
use crate::tfvars::TfVars;
use crate::version;

/// DNS-label pattern that root and custom domain names must match.
pub const VALID_DOMAIN_PATTERN: &str =
    r"^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z0-9][a-z0-9-]{0,61}[a-z0-9]$";

static DOMAIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(VALID_DOMAIN_PATTERN).expect("valid regex"));

/// Default values for [`Settings`], with the tfvars tier already folded in.
#[derive(Debug, Clone)]
pub struct SettingsDefaults {
    pub debug_mode: bool,
    pub dump_defaults: bool,
    pub aws_profile: Option<String>,
    pub aws_region: String,
    pub aws_dynamodb_table_id: String,
    pub aws_rekognition_collection_id: String,
    pub aws_rekognition_face_detect_max_faces_count: i32,
    pub aws_rekognition_face_detect_threshold: i32,
    pub aws_rekognition_face_detect_attributes: String,
    pub aws_rekognition_face_detect_quality_filter: String,
    pub aws_apigateway_root_domain: Option<String>,
    pub aws_apigateway_custom_domain_name_create: bool,
    pub langchain_memory_key: String,
    pub openai_api_organization: Option<String>,
    pub openai_api_key: SecretString,
    pub openai_endpoint_image_n: i32,
    pub openai_endpoint_image_size: String,
    pub pinecone_api_key: SecretString,
    pub shared_resource_identifier: String,
}

impl SettingsDefaults {
    /// Build the default tier from a parsed tfvars file. Variables the file
    /// does not carry fall back to hardcoded values.
    pub fn from_tfvars(tfvars: &TfVars) -> Self {
        let aws_dynamodb_table_id = "rekognition".to_string();
        let aws_rekognition_collection_id = format!("{aws_dynamodb_table_id}-collection");
        Self {
            debug_mode: tfvars.get_bool("debug_mode").unwrap_or(false),
            dump_defaults: tfvars.get_bool("dump_defaults").unwrap_or(false),
            aws_profile: tfvars.get_str("aws_profile"),
            aws_region: tfvars
                .get_str("aws_region")
                .unwrap_or_else(|| "us-east-1".to_string()),
            aws_dynamodb_table_id,
            aws_rekognition_collection_id,
            aws_rekognition_face_detect_max_faces_count: 10,
            aws_rekognition_face_detect_threshold: 10,
            aws_rekognition_face_detect_attributes: "DEFAULT".to_string(),
            aws_rekognition_face_detect_quality_filter: "AUTO".to_string(),
            aws_apigateway_root_domain: tfvars.get_str("root_domain"),
            aws_apigateway_custom_domain_name_create: tfvars
                .get_bool("create_custom_domain")
                .unwrap_or(false),
            langchain_memory_key: "chat_history".to_string(),
            openai_api_organization: None,
            openai_api_key: SecretString::none(),
            openai_endpoint_image_n: 4,
            openai_endpoint_image_size: "1024x768".to_string(),
            pinecone_api_key: SecretString::none(),
            shared_resource_identifier: tfvars
                .get_str("shared_resource_identifier")
                .unwrap_or_else(|| "openai".to_string()),
        }
    }

    /// Default custom domain name, `api.<identifier>.<root domain>`, when a
    /// root domain is known.
    pub fn custom_domain_name(&self) -> Option<String> {
        self.aws_apigateway_root_domain
            .as_ref()
            .map(|root| format!("api.{}.{}", self.shared_resource_identifier, root))
    }

    /// Serialized listing for the diagnostic dump. Secret defaults render
    /// through their redacting Display.
    pub fn to_json(&self) -> Value {
        json!({
            "debug_mode": self.debug_mode,
            "dump_defaults": self.dump_defaults,
            "aws_profile": self.aws_profile,
            "aws_region": self.aws_region,
            "aws_dynamodb_table_id": self.aws_dynamodb_table_id,
            "aws_rekognition_collection_id": self.aws_rekognition_collection_id,
            "aws_rekognition_face_detect_max_faces_count":
                self.aws_rekognition_face_detect_max_faces_count,
            "aws_rekognition_face_detect_threshold": self.aws_rekognition_face_detect_threshold,
            "aws_rekognition_face_detect_attributes": self.aws_rekognition_face_detect_attributes,
            "aws_rekognition_face_detect_quality_filter":
                self.aws_rekognition_face_detect_quality_filter,
            "aws_apigateway_root_domain": self.aws_apigateway_root_domain,
            "aws_apigateway_custom_domain_name_create":
                self.aws_apigateway_custom_domain_name_create,
            "aws_apigateway_custom_domain_name": self.custom_domain_name(),
            "langchain_memory_key": self.langchain_memory_key,
            "openai_api_organization": self.openai_api_organization,
            "openai_api_key": self.openai_api_key.to_string(),
            "openai_endpoint_image_n": self.openai_endpoint_image_n,
            "openai_endpoint_image_size": self.openai_endpoint_image_size,
            "pinecone_api_key": self.pinecone_api_key.to_string(),
            "shared_resource_identifier": self.shared_resource_identifier,
            "valid_domain_pattern": VALID_DOMAIN_PATTERN,
        })
    }
}

impl Default for SettingsDefaults {
    fn default() -> Self {
        Self::from_tfvars(&TfVars::default())
    }
}

/// Empty or missing input falls back to the default; members of the textual
/// truthy set parse as true; any other non-empty string is false.
fn empty_str_to_bool_default(v: Option<&str>, default: bool) -> bool {
    match v {
        None | Some("") => default,
        Some(s) => matches!(
            s.to_ascii_lowercase().as_str(),
            "true" | "1" | "t" | "y" | "yes"
        ),
    }
}

/// Empty, missing, or non-numeric input falls back to the default.
fn empty_str_to_int_default(v: Option<&str>, default: i32) -> i32 {
    match v {
        None | Some("") => default,
        Some(s) => s.trim().parse().unwrap_or(default),
    }
}

fn resolve_bool(arg: Option<bool>, env: Option<&str>, default: bool) -> bool {
    match arg {
        Some(v) => v,
        None => empty_str_to_bool_default(env, default),
    }
}

fn resolve_int(arg: Option<i32>, env: Option<&str>, default: i32) -> i32 {
    match arg {
        Some(v) => v,
        None => empty_str_to_int_default(env, default),
    }
}

fn resolve_string(arg: Option<String>, env: Option<&str>, default: String) -> String {
    resolve_opt_string(arg, env, Some(default)).unwrap_or_default()
}

fn resolve_opt_string(
    arg: Option<String>,
    env: Option<&str>,
    default: Option<String>,
) -> Option<String> {
    arg.filter(|s| !s.is_empty())
        .or_else(|| env.filter(|s| !s.is_empty()).map(str::to_string))
        .or(default)
}

fn resolve_secret(
    arg: Option<SecretString>,
    env: Option<&str>,
    default: SecretString,
) -> SecretString {
    match arg {
        Some(secret) if secret.is_set() => secret,
        _ => match env {
            Some(v) if !v.is_empty() => SecretString::new(v),
            _ => default,
        },
    }
}

/// Resolve a domain-name field and enforce the DNS-label pattern on any
/// present value.
fn resolve_domain(
    arg: Option<String>,
    env: Option<&str>,
    default: Option<String>,
    field: &str,
) -> Result<Option<String>> {
    match resolve_opt_string(arg, env, default) {
        Some(v) if DOMAIN_RE.is_match(&v) => Ok(Some(v)),
        Some(v) => Err(Error::Value(format!("invalid {field}: {v}"))),
        None => Ok(None),
    }
}

/// Which tier supplied a secret: the environment wins over an init argument,
/// independent of whether the value itself is usable.
fn secret_source(env: &Environment, var: &str, arg: Option<&SecretString>) -> SecretSource {
    if env.contains(var) {
        SecretSource::EnvironmentVariable
    } else if arg.is_some_and(SecretString::is_set) {
        SecretSource::InitArgument
    } else {
        SecretSource::Unset
    }
}

async fn fetch_valid_regions(config: &SdkConfig) -> Result<Vec<String>> {
    let client = aws_sdk_ec2::Client::new(config);
    let output = client
        .describe_regions()
        .send()
        .await
        .map_err(|e| Error::Aws(format!("DescribeRegions failed: {e}")))?;
    Ok(output
        .regions()
        .iter()
        .filter_map(|r| r.region_name().map(str::to_string))
        .collect())
}

/// Builder holding the highest-precedence tier: explicit init arguments.
///
/// `environment`, `tfvars`, and `aws_regions` are injection points; when left
/// unset, the process environment is captured, `terraform.tfvars` is
/// discovered on disk, and the valid-region list is fetched live from EC2.
#[derive(Debug, Clone, Default)]
pub struct SettingsBuilder {
    debug_mode: Option<bool>,
    dump_defaults: Option<bool>,
    aws_profile: Option<String>,
    aws_region: Option<String>,
    aws_regions: Option<Vec<String>>,
    aws_apigateway_root_domain: Option<String>,
    aws_apigateway_custom_domain_name: Option<String>,
    aws_apigateway_custom_domain_name_create: Option<bool>,
    aws_dynamodb_table_id: Option<String>,
    aws_rekognition_collection_id: Option<String>,
    aws_rekognition_face_detect_attributes: Option<String>,
    aws_rekognition_face_detect_quality_filter: Option<String>,
    aws_rekognition_face_detect_max_faces_count: Option<i32>,
    aws_rekognition_face_detect_threshold: Option<i32>,
    langchain_memory_key: Option<String>,
    openai_api_organization: Option<String>,
    openai_api_key: Option<SecretString>,
    openai_endpoint_image_n: Option<i32>,
    openai_endpoint_image_size: Option<String>,
    pinecone_api_key: Option<SecretString>,
    shared_resource_identifier: Option<String>,
    environment: Option<Environment>,
    tfvars: Option<TfVars>,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debug_mode(mut self, value: bool) -> Self {
        self.debug_mode = Some(value);
        self
    }

    pub fn dump_defaults(mut self, value: bool) -> Self {
        self.dump_defaults = Some(value);
        self
    }

    pub fn aws_profile(mut self, value: impl Into<String>) -> Self {
        self.aws_profile = Some(value.into());
        self
    }

    pub fn aws_region(mut self, value: impl Into<String>) -> Self {
        self.aws_region = Some(value.into());
        self
    }

    /// Override the valid-region list, skipping the live EC2 lookup.
    pub fn aws_regions(mut self, value: Vec<String>) -> Self {
        self.aws_regions = Some(value);
        self
    }

    pub fn aws_apigateway_root_domain(mut self, value: impl Into<String>) -> Self {
        self.aws_apigateway_root_domain = Some(value.into());
        self
    }

    pub fn aws_apigateway_custom_domain_name(mut self, value: impl Into<String>) -> Self {
        self.aws_apigateway_custom_domain_name = Some(value.into());
        self
    }

    pub fn aws_apigateway_custom_domain_name_create(mut self, value: bool) -> Self {
        self.aws_apigateway_custom_domain_name_create = Some(value);
        self
    }

    pub fn aws_dynamodb_table_id(mut self, value: impl Into<String>) -> Self {
        self.aws_dynamodb_table_id = Some(value.into());
        self
    }

    pub fn aws_rekognition_collection_id(mut self, value: impl Into<String>) -> Self {
        self.aws_rekognition_collection_id = Some(value.into());
        self
    }

    pub fn aws_rekognition_face_detect_attributes(mut self, value: impl Into<String>) -> Self {
        self.aws_rekognition_face_detect_attributes = Some(value.into());
        self
    }

    pub fn aws_rekognition_face_detect_quality_filter(mut self, value: impl Into<String>) -> Self {
        self.aws_rekognition_face_detect_quality_filter = Some(value.into());
        self
    }

    pub fn aws_rekognition_face_detect_max_faces_count(mut self, value: i32) -> Self {
        self.aws_rekognition_face_detect_max_faces_count = Some(value);
        self
    }

    pub fn aws_rekognition_face_detect_threshold(mut self, value: i32) -> Self {
        self.aws_rekognition_face_detect_threshold = Some(value);
        self
    }

    pub fn langchain_memory_key(mut self, value: impl Into<String>) -> Self {
        self.langchain_memory_key = Some(value.into());
        self
    }

    pub fn openai_api_organization(mut self, value: impl Into<String>) -> Self {
        self.openai_api_organization = Some(value.into());
        self
    }

    pub fn openai_api_key(mut self, value: impl Into<SecretString>) -> Self {
        self.openai_api_key = Some(value.into());
        self
    }

    pub fn openai_endpoint_image_n(mut self, value: i32) -> Self {
        self.openai_endpoint_image_n = Some(value);
        self
    }

    pub fn openai_endpoint_image_size(mut self, value: impl Into<String>) -> Self {
        self.openai_endpoint_image_size = Some(value.into());
        self
    }

    pub fn pinecone_api_key(mut self, value: impl Into<SecretString>) -> Self {
        self.pinecone_api_key = Some(value.into());
        self
    }

    pub fn shared_resource_identifier(mut self, value: impl Into<String>) -> Self {
        self.shared_resource_identifier = Some(value.into());
        self
    }

    /// Inject an environment snapshot instead of capturing the process
    /// environment.
    pub fn environment(mut self, value: Environment) -> Self {
        self.environment = Some(value);
        self
    }

    /// Inject a tfvars map instead of discovering `terraform.tfvars` on disk.
    pub fn tfvars(mut self, value: TfVars) -> Self {
        self.tfvars = Some(value);
        self
    }

    /// Run the resolution pass: one resolver per field in declaration order,
    /// then schema validation. All-or-nothing; no partial state escapes.
    pub async fn build(self) -> Result<Settings> {
        let environment = self.environment.unwrap_or_else(Environment::capture);
        let project_root = project::project_root(&environment);
        let tfvars = self
            .tfvars
            .unwrap_or_else(|| TfVars::discover(&project_root));
        let defaults = SettingsDefaults::from_tfvars(&tfvars);

        // provenance is decided by which tier supplied the secret, before the
        // value itself is resolved
        let openai_api_key_source =
            secret_source(&environment, "OPENAI_API_KEY", self.openai_api_key.as_ref());
        let pinecone_api_key_source = secret_source(
            &environment,
            "PINECONE_API_KEY",
            self.pinecone_api_key.as_ref(),
        );

        let env = &environment;
        let debug_mode = resolve_bool(self.debug_mode, env.get("DEBUG_MODE"), defaults.debug_mode);
        let dump_defaults = resolve_bool(
            self.dump_defaults,
            env.get("DUMP_DEFAULTS"),
            defaults.dump_defaults,
        );
        let aws_profile = resolve_opt_string(
            self.aws_profile,
            env.get("AWS_PROFILE"),
            defaults.aws_profile.clone(),
        );
        let aws_region = resolve_string(
            self.aws_region,
            env.get("AWS_REGION"),
            defaults.aws_region.clone(),
        );

        let aws_regions = match self.aws_regions {
            Some(regions) => regions,
            None => {
                let bootstrap = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(aws_region.clone()))
                    .load()
                    .await;
                fetch_valid_regions(&bootstrap).await?
            }
        };
        if !aws_regions.contains(&aws_region) {
            return Err(Error::Value(format!(
                "aws_region {aws_region} not in aws_regions"
            )));
        }

        let aws_apigateway_root_domain = resolve_domain(
            self.aws_apigateway_root_domain,
            env.get("AWS_APIGATEWAY_ROOT_DOMAIN_NAME"),
            defaults.aws_apigateway_root_domain.clone(),
            "root domain name",
        )?;
        let aws_apigateway_custom_domain_name = resolve_domain(
            self.aws_apigateway_custom_domain_name,
            env.get("AWS_APIGATEWAY_CUSTOM_DOMAIN_NAME"),
            defaults.custom_domain_name(),
            "custom domain name",
        )?;
        let aws_apigateway_custom_domain_name_create = resolve_bool(
            self.aws_apigateway_custom_domain_name_create,
            env.get("AWS_APIGATEWAY_CUSTOM_DOMAIN_NAME_CREATE"),
            defaults.aws_apigateway_custom_domain_name_create,
        );
        let aws_dynamodb_table_id = resolve_string(
            self.aws_dynamodb_table_id,
            env.get("AWS_DYNAMODB_TABLE_ID"),
            defaults.aws_dynamodb_table_id.clone(),
        );
        let aws_rekognition_collection_id = resolve_string(
            self.aws_rekognition_collection_id,
            env.get("AWS_REKOGNITION_COLLECTION_ID"),
            defaults.aws_rekognition_collection_id.clone(),
        );
        let aws_rekognition_face_detect_attributes = resolve_string(
            self.aws_rekognition_face_detect_attributes,
            env.get("AWS_REKOGNITION_FACE_DETECT_ATTRIBUTES"),
            defaults.aws_rekognition_face_detect_attributes.clone(),
        );
        let aws_rekognition_face_detect_quality_filter = resolve_string(
            self.aws_rekognition_face_detect_quality_filter,
            env.get("AWS_REKOGNITION_FACE_DETECT_QUALITY_FILTER"),
            defaults.aws_rekognition_face_detect_quality_filter.clone(),
        );
        let aws_rekognition_face_detect_max_faces_count = resolve_int(
            self.aws_rekognition_face_detect_max_faces_count,
            env.get("AWS_REKOGNITION_FACE_DETECT_MAX_FACES_COUNT"),
            defaults.aws_rekognition_face_detect_max_faces_count,
        );
        let aws_rekognition_face_detect_threshold = resolve_int(
            self.aws_rekognition_face_detect_threshold,
            env.get("AWS_REKOGNITION_FACE_DETECT_THRESHOLD"),
            defaults.aws_rekognition_face_detect_threshold,
        );
        let langchain_memory_key = resolve_string(
            self.langchain_memory_key,
            env.get("LANGCHAIN_MEMORY_KEY"),
            defaults.langchain_memory_key.clone(),
        );
        let openai_api_organization = resolve_opt_string(
            self.openai_api_organization,
            env.get("OPENAI_API_ORGANIZATION"),
            defaults.openai_api_organization.clone(),
        );
        let openai_api_key = resolve_secret(
            self.openai_api_key,
            env.get("OPENAI_API_KEY"),
            defaults.openai_api_key.clone(),
        );
        let openai_endpoint_image_n = resolve_int(
            self.openai_endpoint_image_n,
            env.get("OPENAI_ENDPOINT_IMAGE_N"),
            defaults.openai_endpoint_image_n,
        );
        let openai_endpoint_image_size = resolve_string(
            self.openai_endpoint_image_size,
            env.get("OPENAI_ENDPOINT_IMAGE_SIZE"),
            defaults.openai_endpoint_image_size.clone(),
        );
        let pinecone_api_key = resolve_secret(
            self.pinecone_api_key,
            env.get("PINECONE_API_KEY"),
            defaults.pinecone_api_key.clone(),
        );
        let shared_resource_identifier = resolve_string(
            self.shared_resource_identifier,
            env.get("SHARED_RESOURCE_IDENTIFIER"),
            defaults.shared_resource_identifier.clone(),
        );

        let version = version::semantic_version(&project_root.join("VERSION"))?;

        let settings = Settings {
            debug_mode,
            dump_defaults,
            aws_profile,
            aws_regions,
            aws_region,
            aws_apigateway_root_domain,
            aws_apigateway_custom_domain_name,
            aws_apigateway_custom_domain_name_create,
            aws_dynamodb_table_id,
            aws_rekognition_collection_id,
            aws_rekognition_face_detect_attributes,
            aws_rekognition_face_detect_quality_filter,
            aws_rekognition_face_detect_max_faces_count,
            aws_rekognition_face_detect_threshold,
            langchain_memory_key,
            openai_api_organization,
            openai_api_key,
            openai_endpoint_image_n,
            openai_endpoint_image_size,
            pinecone_api_key,
            shared_resource_identifier,
            openai_api_key_source,
            pinecone_api_key_source,
            environment,
            tfvars,
            defaults,
            project_root,
            version,
            session: OnceCell::new(),
            api_client: OnceLock::new(),
            s3_client: OnceLock::new(),
            dynamodb_client: OnceLock::new(),
            rekognition_client: OnceLock::new(),
            dynamodb_table: OnceLock::new(),
            dump: OnceLock::new(),
        };
        settings.validate()?;
        tracing::debug!(
            region = %settings.aws_region,
            version = %settings.version,
            "settings resolved"
        );
        Ok(settings)
    }
}

/// Handle pairing the DynamoDB client with the resolved table name.
#[derive(Debug, Clone)]
pub struct DynamoDbTable {
    client: aws_sdk_dynamodb::Client,
    table_name: String,
}

impl DynamoDbTable {
    pub fn client(&self) -> &aws_sdk_dynamodb::Client {
        &self.client
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

/// Fully-resolved, immutable settings.
///
/// Fields never change after construction; AWS clients and the diagnostic
/// dump are memoized on first access for the object's lifetime.
#[derive(Debug, Validate)]
pub struct Settings {
    debug_mode: bool,
    dump_defaults: bool,
    aws_profile: Option<String>,
    aws_regions: Vec<String>,
    aws_region: String,
    aws_apigateway_root_domain: Option<String>,
    aws_apigateway_custom_domain_name: Option<String>,
    aws_apigateway_custom_domain_name_create: bool,
    aws_dynamodb_table_id: String,
    aws_rekognition_collection_id: String,
    aws_rekognition_face_detect_attributes: String,
    aws_rekognition_face_detect_quality_filter: String,
    #[validate(range(min = 1))]
    aws_rekognition_face_detect_max_faces_count: i32,
    #[validate(range(min = 1))]
    aws_rekognition_face_detect_threshold: i32,
    langchain_memory_key: String,
    openai_api_organization: Option<String>,
    openai_api_key: SecretString,
    openai_endpoint_image_n: i32,
    openai_endpoint_image_size: String,
    pinecone_api_key: SecretString,
    shared_resource_identifier: String,

    openai_api_key_source: SecretSource,
    pinecone_api_key_source: SecretSource,

    environment: Environment,
    tfvars: TfVars,
    defaults: SettingsDefaults,
    project_root: PathBuf,
    version: String,

    session: OnceCell<SdkConfig>,
    api_client: OnceLock<aws_sdk_apigateway::Client>,
    s3_client: OnceLock<aws_sdk_s3::Client>,
    dynamodb_client: OnceLock<aws_sdk_dynamodb::Client>,
    rekognition_client: OnceLock<aws_sdk_rekognition::Client>,
    dynamodb_table: OnceLock<DynamoDbTable>,
    dump: OnceLock<Value>,
}

impl Settings {
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::new()
    }

    /// Build settings with no init arguments, wrapping any failure into a
    /// configuration error. Callers treat a failure here as fatal.
    pub async fn new() -> Result<Self> {
        SettingsBuilder::new()
            .build()
            .await
            .map_err(|e| Error::Configuration(format!("invalid configuration: {e}")))
    }

    pub fn debug_mode(&self) -> bool {
        self.debug_mode
    }

    pub fn dump_defaults(&self) -> bool {
        self.dump_defaults
    }

    pub fn aws_profile(&self) -> Option<&str> {
        self.aws_profile.as_deref()
    }

    /// The list of valid AWS regions.
    pub fn aws_regions(&self) -> &[String] {
        &self.aws_regions
    }

    pub fn aws_region(&self) -> &str {
        &self.aws_region
    }

    pub fn aws_apigateway_root_domain(&self) -> Option<&str> {
        self.aws_apigateway_root_domain.as_deref()
    }

    pub fn aws_apigateway_custom_domain_name(&self) -> Option<&str> {
        self.aws_apigateway_custom_domain_name.as_deref()
    }

    pub fn aws_apigateway_custom_domain_name_create(&self) -> bool {
        self.aws_apigateway_custom_domain_name_create
    }

    pub fn aws_dynamodb_table_id(&self) -> &str {
        &self.aws_dynamodb_table_id
    }

    pub fn aws_rekognition_collection_id(&self) -> &str {
        &self.aws_rekognition_collection_id
    }

    pub fn aws_rekognition_face_detect_attributes(&self) -> &str {
        &self.aws_rekognition_face_detect_attributes
    }

    pub fn aws_rekognition_face_detect_quality_filter(&self) -> &str {
        &self.aws_rekognition_face_detect_quality_filter
    }

    pub fn aws_rekognition_face_detect_max_faces_count(&self) -> i32 {
        self.aws_rekognition_face_detect_max_faces_count
    }

    pub fn aws_rekognition_face_detect_threshold(&self) -> i32 {
        self.aws_rekognition_face_detect_threshold
    }

    pub fn langchain_memory_key(&self) -> &str {
        &self.langchain_memory_key
    }

    pub fn openai_api_organization(&self) -> Option<&str> {
        self.openai_api_organization.as_deref()
    }

    pub fn openai_api_key(&self) -> &SecretString {
        &self.openai_api_key
    }

    pub fn openai_endpoint_image_n(&self) -> i32 {
        self.openai_endpoint_image_n
    }

    pub fn openai_endpoint_image_size(&self) -> &str {
        &self.openai_endpoint_image_size
    }

    pub fn pinecone_api_key(&self) -> &SecretString {
        &self.pinecone_api_key
    }

    pub fn shared_resource_identifier(&self) -> &str {
        &self.shared_resource_identifier
    }

    /// OpenAI API key provenance.
    pub fn openai_api_key_source(&self) -> SecretSource {
        self.openai_api_key_source
    }

    /// Pinecone API key provenance.
    pub fn pinecone_api_key_source(&self) -> SecretSource {
        self.pinecone_api_key_source
    }

    /// Is the dotenv file being used?
    pub fn is_using_dotenv_file(&self) -> bool {
        self.environment.is_using_dotenv_file()
    }

    /// Is the tfvars file being used?
    pub fn is_using_tfvars_file(&self) -> bool {
        self.tfvars.is_loaded()
    }

    /// Future: is the AWS Rekognition service being used?
    pub fn is_using_aws_rekognition(&self) -> bool {
        false
    }

    /// Future: is the AWS DynamoDB service being used?
    pub fn is_using_aws_dynamodb(&self) -> bool {
        false
    }

    /// Names of captured environment variables.
    pub fn environment_variables(&self) -> Vec<String> {
        self.environment.names()
    }

    /// Names of recognized tfvars variables.
    pub fn tfvars_variables(&self) -> Vec<String> {
        self.tfvars.names()
    }

    /// Defaults this instance resolved against.
    pub fn defaults(&self) -> &SettingsDefaults {
        &self.defaults
    }

    pub fn project_root(&self) -> &std::path::Path {
        &self.project_root
    }

    /// Cleaned semantic version from the VERSION artifact.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// AWS session, loaded once with the resolved profile and region.
    pub async fn aws_session(&self) -> &SdkConfig {
        self.session
            .get_or_init(|| async {
                let loader = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(self.aws_region.clone()));
                let loader = match &self.aws_profile {
                    Some(profile) => loader.profile_name(profile.as_str()),
                    None => loader,
                };
                loader.load().await
            })
            .await
    }

    /// API Gateway client.
    pub async fn api_client(&self) -> &aws_sdk_apigateway::Client {
        if let Some(client) = self.api_client.get() {
            return client;
        }
        let session = self.aws_session().await;
        self.api_client
            .get_or_init(|| aws_sdk_apigateway::Client::new(session))
    }

    /// S3 client.
    pub async fn s3_client(&self) -> &aws_sdk_s3::Client {
        if let Some(client) = self.s3_client.get() {
            return client;
        }
        let session = self.aws_session().await;
        self.s3_client
            .get_or_init(|| aws_sdk_s3::Client::new(session))
    }

    /// DynamoDB client.
    pub async fn dynamodb_client(&self) -> &aws_sdk_dynamodb::Client {
        if let Some(client) = self.dynamodb_client.get() {
            return client;
        }
        let session = self.aws_session().await;
        self.dynamodb_client
            .get_or_init(|| aws_sdk_dynamodb::Client::new(session))
    }

    /// Rekognition client.
    pub async fn rekognition_client(&self) -> &aws_sdk_rekognition::Client {
        if let Some(client) = self.rekognition_client.get() {
            return client;
        }
        let session = self.aws_session().await;
        self.rekognition_client
            .get_or_init(|| aws_sdk_rekognition::Client::new(session))
    }

    /// DynamoDB table handle for the resolved table id.
    pub async fn dynamodb_table(&self) -> &DynamoDbTable {
        if let Some(table) = self.dynamodb_table.get() {
            return table;
        }
        let client = self.dynamodb_client().await.clone();
        self.dynamodb_table.get_or_init(|| DynamoDbTable {
            client,
            table_name: self.aws_dynamodb_table_id.clone(),
        })
    }

    /// Diagnostic dump: resolved values, provenance, and runtime context,
    /// recursively key-sorted and computed once.
    pub fn dump(&self) -> &Value {
        self.dump.get_or_init(|| {
            let mut dump = json!({
                "secrets": {
                    "openai_api_source": self.openai_api_key_source,
                    "pinecone_api_source": self.pinecone_api_key_source,
                },
                "environment": {
                    "is_using_tfvars_file": self.is_using_tfvars_file(),
                    "is_using_dotenv_file": self.is_using_dotenv_file(),
                    "os": std::env::consts::OS,
                    "family": std::env::consts::FAMILY,
                    "arch": std::env::consts::ARCH,
                    "sdk": "aws-sdk-rust",
                    "shared_resource_identifier": self.shared_resource_identifier,
                    "debug_mode": self.debug_mode,
                    "dump_defaults": self.dump_defaults,
                    "version": self.version,
                },
                "aws": {
                    "aws_profile": self.aws_profile,
                    "aws_region": self.aws_region,
                },
                "aws_api_gateway": {
                    "aws_apigateway_root_domain": self.aws_apigateway_root_domain,
                    "aws_apigateway_custom_domain_name_create":
                        self.aws_apigateway_custom_domain_name_create,
                    "aws_apigateway_custom_domain_name": self.aws_apigateway_custom_domain_name,
                },
                "openai_api": {
                    "langchain_memory_key": self.langchain_memory_key,
                    "openai_endpoint_image_n": self.openai_endpoint_image_n,
                    "openai_endpoint_image_size": self.openai_endpoint_image_size,
                },
            });
            if self.dump_defaults {
                let mut defaults = self.defaults.to_json();
                defaults["valid_aws_regions"] = json!(self.aws_regions);
                dump["settings_defaults"] = defaults;
            }
            if self.is_using_aws_rekognition() {
                dump["aws_rekognition"] = json!({
                    "aws_rekognition_collection_id": self.aws_rekognition_collection_id,
                    "aws_rekognition_face_detect_max_faces_count":
                        self.aws_rekognition_face_detect_max_faces_count,
                    "aws_rekognition_face_detect_attributes":
                        self.aws_rekognition_face_detect_attributes,
                    "aws_rekognition_face_detect_quality_filter":
                        self.aws_rekognition_face_detect_quality_filter,
                });
            }
            if self.is_using_aws_dynamodb() {
                dump["aws_dynamodb"] = json!({
                    "aws_dynamodb_table_id": self.aws_dynamodb_table_id,
                });
            }
            if self.is_using_dotenv_file() {
                dump["environment"]["dotenv"] = json!(self.environment_variables());
            }
            if self.is_using_tfvars_file() {
                dump["environment"]["tfvars"] = json!(self.tfvars_variables());
            }
            sort_keys(dump)
        })
    }
}

/// Recursively sort all object keys alphabetically.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect(),
            )
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_env(pairs: &[(&str, &str)]) -> Environment {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn test_regions() -> Vec<String> {
        vec!["us-east-1".to_string(), "us-west-2".to_string()]
    }

    fn base_builder() -> SettingsBuilder {
        Settings::builder()
            .environment(test_env(&[]))
            .tfvars(TfVars::default())
            .aws_regions(test_regions())
    }

    #[test]
    fn test_bool_parsing_truthy_set() {
        for truthy in ["true", "1", "t", "y", "yes", "TRUE", "Yes", "Y"] {
            assert!(empty_str_to_bool_default(Some(truthy), false), "{truthy}");
        }
        for falsy in ["false", "0", "no", "nope", "offish"] {
            assert!(!empty_str_to_bool_default(Some(falsy), true), "{falsy}");
        }
        assert!(empty_str_to_bool_default(None, true));
        assert!(empty_str_to_bool_default(Some(""), true));
        assert!(!empty_str_to_bool_default(Some(""), false));
    }

    #[test]
    fn test_int_parsing_falls_back_to_default() {
        assert_eq!(empty_str_to_int_default(Some("42"), 10), 42);
        assert_eq!(empty_str_to_int_default(Some("not-a-number"), 10), 10);
        assert_eq!(empty_str_to_int_default(Some(""), 10), 10);
        assert_eq!(empty_str_to_int_default(None, 10), 10);
    }

    #[test]
    fn test_string_precedence() {
        // builder argument beats environment beats default
        assert_eq!(
            resolve_string(Some("arg".into()), Some("env"), "default".into()),
            "arg"
        );
        assert_eq!(resolve_string(None, Some("env"), "default".into()), "env");
        assert_eq!(resolve_string(None, None, "default".into()), "default");
        // empty strings count as missing
        assert_eq!(
            resolve_string(Some(String::new()), Some(""), "default".into()),
            "default"
        );
    }

    #[tokio::test]
    async fn test_hardcoded_defaults() {
        let settings = base_builder().build().await.unwrap();
        assert!(!settings.debug_mode());
        assert!(!settings.dump_defaults());
        assert_eq!(settings.aws_region(), "us-east-1");
        assert_eq!(settings.aws_dynamodb_table_id(), "rekognition");
        assert_eq!(
            settings.aws_rekognition_collection_id(),
            "rekognition-collection"
        );
        assert_eq!(settings.aws_rekognition_face_detect_max_faces_count(), 10);
        assert_eq!(settings.aws_rekognition_face_detect_threshold(), 10);
        assert_eq!(settings.aws_rekognition_face_detect_attributes(), "DEFAULT");
        assert_eq!(
            settings.aws_rekognition_face_detect_quality_filter(),
            "AUTO"
        );
        assert_eq!(settings.langchain_memory_key(), "chat_history");
        assert_eq!(settings.openai_endpoint_image_n(), 4);
        assert_eq!(settings.openai_endpoint_image_size(), "1024x768");
        assert_eq!(settings.shared_resource_identifier(), "openai");
        assert!(!settings.openai_api_key().is_set());
        assert!(!settings.pinecone_api_key().is_set());
        assert!(!settings.version().is_empty());
    }

    #[tokio::test]
    async fn test_environment_tier_overrides_defaults() {
        let env = test_env(&[
            ("AWS_REGION", "us-west-2"),
            ("DEBUG_MODE", "YES"),
            ("OPENAI_ENDPOINT_IMAGE_N", "2"),
            ("SHARED_RESOURCE_IDENTIFIER", "acme"),
        ]);
        let settings = base_builder().environment(env).build().await.unwrap();
        assert_eq!(settings.aws_region(), "us-west-2");
        assert!(settings.debug_mode());
        assert_eq!(settings.openai_endpoint_image_n(), 2);
        assert_eq!(settings.shared_resource_identifier(), "acme");
    }

    #[tokio::test]
    async fn test_builder_tier_overrides_environment() {
        let env = test_env(&[("AWS_REGION", "us-west-2"), ("DEBUG_MODE", "true")]);
        let settings = base_builder()
            .environment(env)
            .aws_region("us-east-1")
            .debug_mode(false)
            .build()
            .await
            .unwrap();
        assert_eq!(settings.aws_region(), "us-east-1");
        assert!(!settings.debug_mode());
    }

    #[tokio::test]
    async fn test_tfvars_tier_feeds_defaults() {
        let tfvars = TfVars::parse(
            "root_domain = \"example.com\"\ndebug_mode = true\naws_region = \"us-west-2\"\n",
        );
        let settings = base_builder().tfvars(tfvars).build().await.unwrap();
        assert!(settings.debug_mode());
        assert_eq!(settings.aws_region(), "us-west-2");
        assert_eq!(settings.aws_apigateway_root_domain(), Some("example.com"));
        // default custom domain is composed from the defaults tier
        assert_eq!(
            settings.aws_apigateway_custom_domain_name(),
            Some("api.openai.example.com")
        );
    }

    #[tokio::test]
    async fn test_unknown_region_is_a_value_error() {
        let err = base_builder()
            .aws_region("mars-1")
            .build()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Value(_)), "{err}");
    }

    #[tokio::test]
    async fn test_empty_region_falls_back_to_default() {
        let env = test_env(&[("AWS_REGION", "")]);
        let settings = base_builder().environment(env).build().await.unwrap();
        assert_eq!(settings.aws_region(), "us-east-1");
    }

    #[tokio::test]
    async fn test_invalid_root_domain_is_a_value_error() {
        let err = base_builder()
            .aws_apigateway_root_domain("not a domain")
            .build()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Value(_)), "{err}");
    }

    #[tokio::test]
    async fn test_valid_root_domain_passes_through() {
        let settings = base_builder()
            .aws_apigateway_root_domain("example.com")
            .build()
            .await
            .unwrap();
        assert_eq!(settings.aws_apigateway_root_domain(), Some("example.com"));
    }

    #[tokio::test]
    async fn test_non_numeric_int_env_uses_default() {
        let env = test_env(&[("AWS_REKOGNITION_FACE_DETECT_MAX_FACES_COUNT", "lots")]);
        let settings = base_builder().environment(env).build().await.unwrap();
        assert_eq!(settings.aws_rekognition_face_detect_max_faces_count(), 10);
    }

    #[tokio::test]
    async fn test_non_positive_count_fails_schema_validation() {
        let err = base_builder()
            .aws_rekognition_face_detect_threshold(0)
            .build()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "{err}");
    }

    #[tokio::test]
    async fn test_secret_provenance_unset() {
        let settings = base_builder().build().await.unwrap();
        assert_eq!(settings.openai_api_key_source(), SecretSource::Unset);
        assert_eq!(settings.pinecone_api_key_source(), SecretSource::Unset);
    }

    #[tokio::test]
    async fn test_secret_provenance_environment_variable() {
        let env = test_env(&[("OPENAI_API_KEY", "sk-test")]);
        let settings = base_builder().environment(env).build().await.unwrap();
        assert_eq!(
            settings.openai_api_key_source(),
            SecretSource::EnvironmentVariable
        );
        assert_eq!(settings.openai_api_key().expose(), Some("sk-test"));
    }

    #[tokio::test]
    async fn test_secret_provenance_env_wins_even_when_empty() {
        // presence of the variable decides provenance, not its value
        let env = test_env(&[("OPENAI_API_KEY", "")]);
        let settings = base_builder()
            .environment(env)
            .openai_api_key("sk-init")
            .build()
            .await
            .unwrap();
        assert_eq!(
            settings.openai_api_key_source(),
            SecretSource::EnvironmentVariable
        );
    }

    #[tokio::test]
    async fn test_secret_provenance_init_argument() {
        let settings = base_builder()
            .pinecone_api_key("pc-test")
            .build()
            .await
            .unwrap();
        assert_eq!(
            settings.pinecone_api_key_source(),
            SecretSource::InitArgument
        );
        assert_eq!(settings.pinecone_api_key().expose(), Some("pc-test"));
    }

    fn assert_keys_sorted(value: &Value) {
        if let Value::Object(map) = value {
            let keys: Vec<&String> = map.keys().collect();
            let mut sorted = keys.clone();
            sorted.sort();
            assert_eq!(keys, sorted);
            for nested in map.values() {
                assert_keys_sorted(nested);
            }
        }
    }

    #[tokio::test]
    async fn test_dump_is_sorted_and_cached() {
        let settings = base_builder().build().await.unwrap();
        let first = settings.dump();
        assert_keys_sorted(first);
        let second = settings.dump();
        assert!(std::ptr::eq(first, second));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_dump_contents() {
        let settings = base_builder().build().await.unwrap();
        let dump = settings.dump();
        assert_eq!(dump["secrets"]["openai_api_source"], "unset");
        assert_eq!(dump["secrets"]["pinecone_api_source"], "unset");
        assert_eq!(dump["aws"]["aws_region"], "us-east-1");
        assert_eq!(dump["openai_api"]["langchain_memory_key"], "chat_history");
        assert_eq!(
            dump["environment"]["version"],
            settings.version().to_string()
        );
        // defaults listing is opt-in
        assert!(dump.get("settings_defaults").is_none());
    }

    #[tokio::test]
    async fn test_dump_defaults_section_is_opt_in() {
        let settings = base_builder().dump_defaults(true).build().await.unwrap();
        let dump = settings.dump();
        let defaults = &dump["settings_defaults"];
        assert_eq!(defaults["aws_dynamodb_table_id"], "rekognition");
        assert_eq!(defaults["valid_domain_pattern"], VALID_DOMAIN_PATTERN);
        assert_eq!(
            defaults["valid_aws_regions"],
            json!(["us-east-1", "us-west-2"])
        );
        // secret defaults never leak values
        assert_eq!(defaults["openai_api_key"], "");
    }

    #[test]
    fn test_sort_keys_recurses() {
        let unsorted = json!({
            "zulu": {"b": 1, "a": 2},
            "alpha": [{"z": 1, "a": 2}],
        });
        let sorted = sort_keys(unsorted);
        assert_keys_sorted(&sorted);
    }

    #[test]
    fn test_custom_domain_default_composition() {
        let tfvars = TfVars::parse("root_domain = \"example.com\"\n");
        let defaults = SettingsDefaults::from_tfvars(&tfvars);
        assert_eq!(
            defaults.custom_domain_name(),
            Some("api.openai.example.com".to_string())
        );
        assert_eq!(SettingsDefaults::default().custom_domain_name(), None);
    }
}
