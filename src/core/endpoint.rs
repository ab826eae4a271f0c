//! Declarative endpoint descriptors and the built-in verification catalog.
//!
//! A descriptor carries everything that differs between verification
//! types: which columns a row must supply, how the request is built, which
//! response fields become output columns, and whether the endpoint needs
//! list expansion or async polling.

use crate::domain::model::{MESSAGE_COLUMN, SERIAL_COLUMN, VALID_COLUMN};
use crate::domain::ports::HttpMethod;
use crate::utils::error::{Result, VerifyError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_JOB_ID_FIELD: &str = "_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// `Authorization: Basic <token>`
    Attestr,
    /// `clientId` / `secretKey` headers
    Invincible,
    /// `x-api-key` plus a pinned `x-api-version`
    Probe42,
    /// No credentials required.
    Open,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attestr => "attestr",
            Self::Invincible => "invincible",
            Self::Probe42 => "probe42",
            Self::Open => "open",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputField {
    pub column: String,
    #[serde(default)]
    pub label: Option<String>,
}

impl InputField {
    pub fn new(column: &str, label: &str) -> Self {
        Self {
            column: column.to_string(),
            label: Some(label.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.column)
    }
}

/// An output column: either a top-level key or a column fed from a nested path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputField {
    Key(String),
    Mapped { column: String, path: String },
}

impl OutputField {
    pub fn column(&self) -> &str {
        match self {
            Self::Key(key) => key,
            Self::Mapped { column, .. } => column,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::Key(key) => key,
            Self::Mapped { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlattenMode {
    #[default]
    Direct,
    Recursive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionSpec {
    pub list_field: String,
    /// Extra join columns besides `sno`; defaults to the endpoint's inputs.
    #[serde(default)]
    pub join_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingSpec {
    /// Status URL with a `{job_id}` placeholder.
    pub status_url: String,
    pub interval_seconds: u64,
    pub max_attempts: u32,
    #[serde(default = "default_job_id_field")]
    pub job_id_field: String,
}

fn default_job_id_field() -> String {
    DEFAULT_JOB_ID_FIELD.to_string()
}

fn default_valid_field() -> String {
    VALID_COLUMN.to_string()
}

fn default_message_field() -> String {
    MESSAGE_COLUMN.to_string()
}

fn default_valid_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub provider: Provider,
    #[serde(default)]
    pub method: HttpMethod,
    pub url: String,
    pub inputs: Vec<InputField>,
    /// Columns forwarded to the request when present, never required.
    #[serde(default)]
    pub optional_inputs: Vec<String>,
    /// JSON body template; string values `"{column}"` are filled per row.
    #[serde(default)]
    pub body: Option<Value>,
    /// Default request options merged into the body; overridable per run.
    #[serde(default)]
    pub options: BTreeMap<String, Value>,
    /// Dotted path of the object holding the verification data.
    #[serde(default)]
    pub response_root: Option<String>,
    #[serde(default = "default_valid_field")]
    pub valid_field: String,
    #[serde(default = "default_message_field")]
    pub message_field: String,
    /// Verdict used when a successful payload carries no `valid_field`.
    #[serde(default = "default_valid_default")]
    pub valid_default: bool,
    #[serde(default)]
    pub expected_keys: Vec<OutputField>,
    #[serde(default)]
    pub flatten: FlattenMode,
    #[serde(default)]
    pub expand: Option<ExpansionSpec>,
    #[serde(default)]
    pub polling: Option<PollingSpec>,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl EndpointDescriptor {
    pub fn input_columns(&self) -> impl Iterator<Item = &str> {
        self.inputs.iter().map(|f| f.column.as_str())
    }

    /// Columns the upload must contain: `sno` plus every input.
    pub fn required_columns(&self) -> Vec<String> {
        std::iter::once(SERIAL_COLUMN)
            .chain(self.input_columns())
            .map(str::to_string)
            .collect()
    }

    /// Columns, besides `sno`, that link expanded rows to their parent.
    pub fn join_columns(&self) -> Vec<String> {
        match &self.expand {
            Some(spec) if !spec.join_columns.is_empty() => spec.join_columns.clone(),
            _ => self.input_columns().map(str::to_string).collect(),
        }
    }

    pub fn timeout(&self, default_secs: u64) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(default_secs))
    }

    pub fn is_async(&self) -> bool {
        self.polling.is_some()
    }

    /// Descriptor options overlaid with per-run overrides.
    pub fn effective_options(&self, overrides: &BTreeMap<String, Value>) -> BTreeMap<String, Value> {
        let mut options = self.options.clone();
        for (key, value) in overrides {
            options.insert(key.clone(), value.clone());
        }
        options
    }
}

impl Validate for EndpointDescriptor {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("endpoints.name", &self.name)?;
        validation::validate_url(&format!("endpoints.{}.url", self.name), &self.url)?;

        if self.inputs.is_empty() {
            return Err(VerifyError::ConfigValidationError {
                field: format!("endpoints.{}.inputs", self.name),
                message: "At least one input column is required".to_string(),
            });
        }

        if let Some(polling) = &self.polling {
            validation::validate_url(
                &format!("endpoints.{}.polling.status_url", self.name),
                &polling.status_url,
            )?;
            validation::validate_positive_number(
                &format!("endpoints.{}.polling.max_attempts", self.name),
                polling.max_attempts as usize,
                1,
            )?;
        }

        if let Some(expand) = &self.expand {
            validation::validate_non_empty_string(
                &format!("endpoints.{}.expand.list_field", self.name),
                &expand.list_field,
            )?;
        }

        Ok(())
    }
}

/// Replaces `{name}` placeholders using `lookup`. Unresolved placeholders
/// are left as-is and reported in the second tuple element.
pub fn fill_template<F>(template: &str, lookup: F) -> (String, Vec<String>)
where
    F: Fn(&str) -> Option<String>,
{
    let mut output = String::with_capacity(template.len());
    let mut unresolved = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        output.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match lookup(name) {
                    Some(value) => output.push_str(&value),
                    None => {
                        unresolved.push(name.to_string());
                        output.push('{');
                        output.push_str(name);
                        output.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                output.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    output.push_str(rest);

    (output, unresolved)
}

/// If `value` is exactly one `{name}` placeholder, returns `name`.
pub fn whole_placeholder(value: &str) -> Option<&str> {
    let inner = value.strip_prefix('{')?.strip_suffix('}')?;
    if inner.is_empty() || inner.contains(['{', '}']) {
        None
    } else {
        Some(inner)
    }
}

pub fn find_endpoint<'a>(
    endpoints: &'a [EndpointDescriptor],
    name: &str,
) -> Result<&'a EndpointDescriptor> {
    endpoints
        .iter()
        .find(|e| e.name == name)
        .ok_or_else(|| VerifyError::UnknownEndpoint {
            name: name.to_string(),
        })
}

/// Built-in catalog, overridden by name with `custom` descriptors.
pub fn merged_catalog(custom: &[EndpointDescriptor]) -> Vec<EndpointDescriptor> {
    let mut catalog = builtin_endpoints();
    for descriptor in custom {
        match catalog.iter_mut().find(|e| e.name == descriptor.name) {
            Some(existing) => *existing = descriptor.clone(),
            None => catalog.push(descriptor.clone()),
        }
    }
    catalog
}

const ATTESTR_BASE: &str = "https://api.attestr.com/api";
const INVINCIBLE_BASE: &str = "https://api.invincibleocean.com/invincible";
const PROBE42_BASE: &str = "https://api.probe42.in/probe_pro_sandbox";
pub const PROBE42_API_VERSION: &str = "1.3";

fn keys(names: &[&str]) -> Vec<OutputField> {
    names.iter().map(|n| OutputField::Key(n.to_string())).collect()
}

fn inputs(fields: &[(&str, &str)]) -> Vec<InputField> {
    fields.iter().map(|(c, l)| InputField::new(c, l)).collect()
}

fn options(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn descriptor(
    name: &str,
    description: &str,
    provider: Provider,
    url: String,
    fields: &[(&str, &str)],
    body: Value,
) -> EndpointDescriptor {
    EndpointDescriptor {
        name: name.to_string(),
        description: description.to_string(),
        provider,
        method: HttpMethod::Post,
        url,
        inputs: inputs(fields),
        optional_inputs: Vec::new(),
        body: Some(body),
        options: BTreeMap::new(),
        response_root: None,
        valid_field: default_valid_field(),
        message_field: default_message_field(),
        valid_default: default_valid_default(),
        expected_keys: Vec::new(),
        flatten: FlattenMode::Direct,
        expand: None,
        polling: None,
        timeout_seconds: Some(10),
    }
}

pub fn builtin_endpoints() -> Vec<EndpointDescriptor> {
    let mut catalog = Vec::new();

    let mut pan = descriptor(
        "pan",
        "PAN verification (name, category, Aadhaar linking)",
        Provider::Attestr,
        format!("{}/v2/public/checkx/pan", ATTESTR_BASE),
        &[("pan", "PAN")],
        json!({"pan": "{pan}"}),
    );
    pan.expected_keys = keys(&["valid", "category", "name", "aadhaarLinked", "message"]);
    catalog.push(pan);

    let mut gstin = descriptor(
        "gstin",
        "GSTIN verification",
        Provider::Attestr,
        format!("{}/v2/public/corpx/gstin", ATTESTR_BASE),
        &[("gstin", "GSTIN")],
        json!({"gstin": "{gstin}"}),
    );
    gstin.options = options(&[("fetchFilings", json!(false))]);
    gstin.expected_keys = keys(&[
        "valid", "active", "legalName", "tradeName", "pan", "constitution", "nature", "type",
        "registered", "updated", "expiry", "state", "stateCode", "center", "centerCode",
        "einvoiceEnabled", "message",
    ]);
    catalog.push(gstin);

    let mut rc = descriptor(
        "vehicle-rc",
        "Vehicle registration certificate check",
        Provider::Attestr,
        format!("{}/v2/public/checkx/rc", ATTESTR_BASE),
        &[("reg", "Registration number")],
        json!({"reg": "{reg}"}),
    );
    rc.expected_keys = keys(&[
        "valid", "status", "registered", "owner", "masked", "ownerNumber", "father",
        "currentAddress", "permanentAddress", "mobile", "category", "categoryDescription",
        "chassisNumber", "engineNumber", "makerDescription", "makerModel", "makerVariant",
        "bodyType", "fuelType", "colorType", "normsType", "fitnessUpto", "financed", "lender",
        "insuranceProvider", "insurancePolicyNumber", "insuranceUpto", "manufactured", "rto",
        "cubicCapacity", "grossWeight", "wheelBase", "unladenWeight", "cylinders",
        "seatingCapacity", "sleepingCapacity", "standingCapacity", "pollutionCertificateNumber",
        "pollutionCertificateUpto", "permitNumber", "permitIssued", "permitFrom", "permitUpto",
        "permitType", "taxUpto", "taxPaidUpto", "nationalPermitNumber", "nationalPermitIssued",
        "nationalPermitFrom", "nationalPermitUpto", "nationalPermitIssuedBy", "commercial",
        "blacklistStatus", "nocDetails", "challanDetails", "exShowroomPrice", "nonUseStatus",
        "nonUseFrom", "nonUseTo", "blacklistDetails", "message",
    ]);
    catalog.push(rc);

    let mut dl = descriptor(
        "driving-licence",
        "Driving licence check (async)",
        Provider::Attestr,
        format!("{}/v1/public/checkx/dl", ATTESTR_BASE),
        &[("dl_number", "DL Number"), ("dob", "DOB")],
        json!({"reg": "{dl_number}", "dob": "{dob}"}),
    );
    dl.options = options(&[("webhook", json!(false))]);
    dl.expected_keys = keys(&[
        "valid", "active", "owner", "issued", "rto", "ntpIssued", "ntpExpiry", "tpIssued",
        "tpExpiry", "type", "categories", "message",
    ]);
    dl.expand = Some(ExpansionSpec {
        list_field: "categories".to_string(),
        join_columns: Vec::new(),
    });
    dl.polling = Some(PollingSpec {
        status_url: format!("{}/v1/public/async/{{job_id}}", ATTESTR_BASE),
        interval_seconds: 10,
        max_attempts: 20,
        job_id_field: default_job_id_field(),
    });
    catalog.push(dl);

    let mut mobile = descriptor(
        "mobile",
        "Phone number validation",
        Provider::Attestr,
        format!("{}/v1/public/checkx/contact", ATTESTR_BASE),
        &[("number", "Mobile number")],
        json!({"number": "{number}"}),
    );
    mobile.expected_keys = keys(&[
        "valid", "type", "localF", "intlF", "prefix", "code", "country", "area", "carrier",
        "message",
    ]);
    catalog.push(mobile);

    let mut email = descriptor(
        "email",
        "Email validation",
        Provider::Attestr,
        format!("{}/v1/public/checkx/email", ATTESTR_BASE),
        &[("email", "Email")],
        json!({"email": "{email}"}),
    );
    email.expected_keys = keys(&["message", "disposable", "role", "tags", "deliverable", "risk"]);
    catalog.push(email);

    let mut bank = descriptor(
        "bank-account",
        "Bank account verification",
        Provider::Attestr,
        format!("{}/v1/public/finanx/acc", ATTESTR_BASE),
        &[("acc", "Account number"), ("ifsc", "IFSC")],
        json!({"acc": "{acc}", "ifsc": "{ifsc}"}),
    );
    bank.options = options(&[("fetchIfsc", json!(false))]);
    bank.expected_keys = keys(&["valid", "name", "status", "message", "suggestion", "ifsc"]);
    catalog.push(bank);

    let mut uan = descriptor(
        "epfo-uan",
        "EPFO UAN employment history",
        Provider::Attestr,
        format!("{}/v2/public/checkx/epfo/uan", ATTESTR_BASE),
        &[("uan", "UAN")],
        json!({"uan": "{uan}"}),
    );
    uan.expected_keys = keys(&["valid", "message", "items"]);
    uan.expand = Some(ExpansionSpec {
        list_field: "items".to_string(),
        join_columns: Vec::new(),
    });
    uan.timeout_seconds = Some(60);
    catalog.push(uan);

    let mut epic = descriptor(
        "voter-id",
        "Voter ID (EPIC) verification",
        Provider::Attestr,
        format!("{}/v1/public/checkx/epic", ATTESTR_BASE),
        &[("epic", "EPIC")],
        json!({"epic": "{epic}"}),
    );
    epic.expected_keys = keys(&[
        "valid", "name", "gender", "relationName", "relationType", "dob", "age", "houseNumber",
        "area", "district", "state", "assemblyConstituency", "assemblyConstituencyNumber",
        "pollingStation", "partNumber", "partName", "serialNumber", "parliamentaryConstituency",
        "message",
    ]);
    catalog.push(epic);

    let mut itr = descriptor(
        "company-itr",
        "Business ITR filing and gross turnover",
        Provider::Attestr,
        format!("{}/v2/public/corpx/itr", ATTESTR_BASE),
        &[
            ("pan", "PAN"),
            ("birthOrIncorporatedDate", "Date of incorporation"),
            ("name", "Name"),
        ],
        json!({
            "pan": "{pan}",
            "birthOrIncorporatedDate": "{birthOrIncorporatedDate}",
            "name": "{name}"
        }),
    );
    itr.expected_keys = keys(&[
        "valid", "message", "panStatus", "fy", "itrFiled", "itrType", "grossTurnover",
        "grossTurnoverFormatted", "exportTurnover", "exportTurnoverFormatted",
    ]);
    catalog.push(itr);

    let court_keys = keys(&[
        "valid", "finalRiskSummary", "casesCount", "records", "finalRiskLevel", "message",
    ]);
    let court_polling = PollingSpec {
        status_url: format!("{}/v2/public/async/{{job_id}}", ATTESTR_BASE),
        interval_seconds: 15,
        max_attempts: 15,
        job_id_field: default_job_id_field(),
    };

    let mut court_person = descriptor(
        "court-person",
        "Court record check for an individual (async)",
        Provider::Attestr,
        format!("{}/v2/public/riskx/person/ecourt", ATTESTR_BASE),
        &[
            ("tag", "Tag"),
            ("name", "Name"),
            ("fatherName", "Father's name"),
            ("birthDate", "Birth date"),
            ("address", "Address"),
        ],
        json!({
            "tag": "{tag}",
            "name": "{name}",
            "fatherName": "{fatherName}",
            "birthDate": "{birthDate}",
            "address": "{address}"
        }),
    );
    court_person.options = options(&[("mode", json!("Quick")), ("webhook", json!(false))]);
    court_person.expected_keys = court_keys.clone();
    court_person.valid_default = false;
    court_person.polling = Some(court_polling.clone());
    court_person.timeout_seconds = Some(20);
    catalog.push(court_person);

    let mut court_business = descriptor(
        "court-business",
        "Court record check for a business (async)",
        Provider::Attestr,
        format!("{}/v2/public/riskx/business/ecourt", ATTESTR_BASE),
        &[("tag", "Tag"), ("businessName", "Business name"), ("address", "Address")],
        json!({
            "tag": "{tag}",
            "businessName": "{businessName}",
            "address": "{address}",
            "reg": "{reg}"
        }),
    );
    court_business.optional_inputs = vec!["reg".to_string()];
    court_business.options = options(&[("mode", json!("Quick")), ("webhook", json!(false))]);
    court_business.expected_keys = court_keys;
    court_business.valid_default = false;
    court_business.polling = Some(court_polling);
    court_business.timeout_seconds = Some(20);
    catalog.push(court_business);

    let mut company = descriptor(
        "mca-company",
        "MCA company master data with directors and signatories",
        Provider::Attestr,
        format!("{}/v2/public/corpx/business/master", ATTESTR_BASE),
        &[("regInput", "CIN")],
        json!({"reg": "{regInput}"}),
    );
    company.options = options(&[
        ("charges", json!(false)),
        ("efilings", json!(false)),
        ("live", json!(false)),
        ("fetchLiveOnCacheMiss", json!(false)),
    ]);
    company.expected_keys = keys(&[
        "valid", "cin", "llpin", "fllpin", "fcrn", "reg", "active", "businessName", "rocCode",
        "registrationNumber", "category", "subCategory", "class", "authorizedCapital",
        "paidCapital", "incorporatedDate", "registeredAddress", "email", "listed",
        "lastAGMDate", "lastBSDate", "partners", "designatedPartners", "previousName",
        "obligation", "industryDivision", "industrySection", "incorporatedCountry",
        "shareCapital", "officeType", "companyType", "type", "status", "inc22AFiled",
        "soatDate", "regionalDirector", "region", "suspendedAtStockExchange",
        "insolvencyStatus", "subscribedCapital", "directorsAndSignatories", "charges",
        "efilings", "indexId", "updated", "message",
    ]);
    company.expand = Some(ExpansionSpec {
        list_field: "directorsAndSignatories".to_string(),
        join_columns: Vec::new(),
    });
    catalog.push(company);

    let mut director = descriptor(
        "mca-director",
        "MCA director master data with associations",
        Provider::Attestr,
        format!("{}/v2/public/corpx/director/master", ATTESTR_BASE),
        &[("din", "DIN")],
        json!({"reg": "{din}"}),
    );
    director.options = options(&[
        ("live", json!(false)),
        ("fetchLiveOnCacheMiss", json!(false)),
        ("advanced", json!(false)),
    ]);
    director.expected_keys = keys(&[
        "valid", "din", "status", "firstName", "middleName", "lastName", "fullName",
        "dinAllocationDate", "disqualified", "disqualificationRemovalDate",
        "disqualificationSection", "disqualificationDate", "disqualificationReason",
        "dinSurrenderDate", "dinSurrenderDeactivationReason", "dir3KYCFiled", "dir3KYCFiledFY",
        "associations", "signatoryAssociations", "pastAssociations", "indexId", "updated",
        "message",
    ]);
    director.expand = Some(ExpansionSpec {
        list_field: "associations".to_string(),
        join_columns: Vec::new(),
    });
    catalog.push(director);

    let search_keys = keys(&[
        "firstName", "middleName", "lastName", "disqualified", "status", "dir3KYCFiled",
        "associations", "indexId", "fullName",
    ]);
    let searches = [
        (
            "mca-director-search-name",
            "MCA director search by name, first match with associations",
            ("fullName", "Full Name"),
            json!({
                "fullName": {
                    "matchCriteria": "CONTAINS",
                    "matchValue": "{fullName}",
                    "enableFuzzy": true
                }
            }),
        ),
        (
            "mca-director-search-pan",
            "MCA director search by PAN, first match with associations",
            ("pan", "PAN"),
            json!({"pan": "{pan}"}),
        ),
    ];
    for (name, description, input, body) in searches {
        let mut search = descriptor(
            name,
            description,
            Provider::Attestr,
            format!("{}/v2/public/corpx/director/search", ATTESTR_BASE),
            &[input],
            body,
        );
        search.response_root = Some("[0]".to_string());
        search.expected_keys = search_keys.clone();
        search.expand = Some(ExpansionSpec {
            list_field: "associations".to_string(),
            join_columns: Vec::new(),
        });
        catalog.push(search);
    }

    let mut probe42 = descriptor(
        "probe42-company",
        "Probe42 comprehensive company details",
        Provider::Probe42,
        format!("{}/companies/{{regInput}}/comprehensive-details", PROBE42_BASE),
        &[("regInput", "CIN")],
        Value::Null,
    );
    probe42.method = HttpMethod::Get;
    probe42.body = None;
    probe42.flatten = FlattenMode::Recursive;
    probe42.timeout_seconds = Some(DEFAULT_TIMEOUT_SECS);
    catalog.push(probe42);

    let mut pan_detailed = descriptor(
        "pan-detailed",
        "Detailed PAN profile",
        Provider::Invincible,
        format!("{}/panPlus", INVINCIBLE_BASE),
        &[("pan", "PAN")],
        json!({"panNumber": "{pan}"}),
    );
    pan_detailed.response_root = Some("result".to_string());
    pan_detailed.expected_keys = keys(&[
        "FIRST_NAME", "MIDDLE_NAME", "LAST_NAME", "AADHAR_NUM", "AADHAR_LINKED", "DOB_VERIFIED",
        "DOB_CHECK", "EMAIL", "DOB", "GENDER", "IDENTITY_TYPE", "MOBILE_NO", "ADDRESS_1",
        "ADDRESS_2", "ADDRESS_3", "PINCODE", "CITY", "STATE", "COUNTRY",
    ]);
    pan_detailed.timeout_seconds = Some(DEFAULT_TIMEOUT_SECS);
    catalog.push(pan_detailed);

    let mut aadhaar_to_pan = descriptor(
        "aadhaar-to-pan",
        "PAN linked to an Aadhaar number",
        Provider::Invincible,
        format!("{}/aadhaarToPan", INVINCIBLE_BASE),
        &[("aadhar", "Aadhaar")],
        json!({"aadharNumber": "{aadhar}"}),
    );
    aadhaar_to_pan.response_root = Some("result".to_string());
    aadhaar_to_pan.valid_field = "success".to_string();
    aadhaar_to_pan.expected_keys = vec![OutputField::Mapped {
        column: "PAN".to_string(),
        path: "data.pan_number".to_string(),
    }];
    aadhaar_to_pan.timeout_seconds = Some(DEFAULT_TIMEOUT_SECS);
    catalog.push(aadhaar_to_pan);

    let mut pan_to_cin = descriptor(
        "pan-to-cin",
        "CIN registered against a PAN",
        Provider::Invincible,
        format!("{}/panToCin", INVINCIBLE_BASE),
        &[("pan", "PAN")],
        json!({"panNumber": "{pan}"}),
    );
    pan_to_cin.response_root = Some("result".to_string());
    pan_to_cin.expected_keys = keys(&["message", "panName", "cinNumber", "cinName"]);
    pan_to_cin.timeout_seconds = Some(DEFAULT_TIMEOUT_SECS);
    catalog.push(pan_to_cin);

    let recursive = [
        ("pan-to-gst", "GST registrations for a PAN", "panToGSTLite", "pan", "PAN", "panNumber"),
        ("gst-to-cin", "CIN for a GSTIN", "gstToCIN", "gst", "GSTIN", "gstNumber"),
        (
            "phone-info",
            "KYC details for a phone number",
            "phoneKycWithoutOtpV1",
            "mob",
            "Mobile number",
            "mobileNumber",
        ),
        (
            "pan-to-aadhaar",
            "Masked Aadhaar linked to a PAN",
            "panToMaskAadhaarLite",
            "pan",
            "PAN",
            "panNumber",
        ),
    ];
    for (name, description, path, column, label, body_key) in recursive {
        let mut endpoint = descriptor(
            name,
            description,
            Provider::Invincible,
            format!("{}/{}", INVINCIBLE_BASE, path),
            &[(column, label)],
            json!({ body_key: format!("{{{}}}", column) }),
        );
        endpoint.flatten = FlattenMode::Recursive;
        endpoint.timeout_seconds = Some(DEFAULT_TIMEOUT_SECS);
        catalog.push(endpoint);
    }

    let mut credit = descriptor(
        "credit-score",
        "Credit bureau score",
        Provider::Invincible,
        format!("{}/creditScoreCheckV2", INVINCIBLE_BASE),
        &[("name", "Name"), ("pan", "PAN"), ("mob", "Mobile number")],
        json!({"name": "{name}", "panNumber": "{pan}", "mobileNumber": "{mob}"}),
    );
    credit.response_root = Some("result".to_string());
    credit.valid_field = "success".to_string();
    credit.expected_keys = vec![
        OutputField::Mapped {
            column: "credit_score".to_string(),
            path: "data.credit_score".to_string(),
        },
        OutputField::Mapped {
            column: "credit_report_link".to_string(),
            path: "data.credit_report_link".to_string(),
        },
    ];
    credit.timeout_seconds = Some(120);
    catalog.push(credit);

    catalog
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_valid_and_unique() {
        let catalog = builtin_endpoints();
        let mut names: Vec<&str> = catalog.iter().map(|e| e.name.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), catalog.len());

        for endpoint in &catalog {
            endpoint.validate().unwrap();
        }
    }

    #[test]
    fn test_async_endpoints() {
        let catalog = builtin_endpoints();
        let async_names: Vec<&str> = catalog
            .iter()
            .filter(|e| e.is_async())
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(async_names, vec!["driving-licence", "court-person", "court-business"]);

        let dl = find_endpoint(&catalog, "driving-licence").unwrap();
        let polling = dl.polling.as_ref().unwrap();
        assert_eq!(polling.interval_seconds, 10);
        assert_eq!(polling.max_attempts, 20);
    }

    #[test]
    fn test_required_and_join_columns() {
        let catalog = builtin_endpoints();
        let bank = find_endpoint(&catalog, "bank-account").unwrap();
        assert_eq!(bank.required_columns(), vec!["sno", "acc", "ifsc"]);

        let dl = find_endpoint(&catalog, "driving-licence").unwrap();
        assert_eq!(dl.join_columns(), vec!["dl_number", "dob"]);
    }

    #[test]
    fn test_director_search_takes_first_match() {
        let catalog = builtin_endpoints();
        let by_name = find_endpoint(&catalog, "mca-director-search-name").unwrap();
        assert_eq!(by_name.required_columns(), vec!["sno", "fullName"]);
        assert_eq!(by_name.join_columns(), vec!["fullName"]);
        assert_eq!(by_name.response_root.as_deref(), Some("[0]"));
        assert_eq!(by_name.body.as_ref().unwrap()["fullName"]["matchValue"], "{fullName}");

        let by_pan = find_endpoint(&catalog, "mca-director-search-pan").unwrap();
        assert_eq!(by_pan.url, by_name.url);
        assert_eq!(by_pan.expand.as_ref().unwrap().list_field, "associations");
    }

    #[test]
    fn test_probe42_company_is_recursive_get() {
        let catalog = builtin_endpoints();
        let probe42 = find_endpoint(&catalog, "probe42-company").unwrap();
        assert_eq!(probe42.provider, Provider::Probe42);
        assert_eq!(probe42.method, HttpMethod::Get);
        assert!(probe42.body.is_none());
        assert_eq!(probe42.flatten, FlattenMode::Recursive);
        assert!(probe42.url.ends_with("/companies/{regInput}/comprehensive-details"));
    }

    #[test]
    fn test_court_checks_default_to_invalid() {
        let catalog = builtin_endpoints();
        for name in ["court-person", "court-business"] {
            assert!(!find_endpoint(&catalog, name).unwrap().valid_default);
        }
        assert!(find_endpoint(&catalog, "pan").unwrap().valid_default);
    }

    #[test]
    fn test_unknown_endpoint() {
        let catalog = builtin_endpoints();
        let err = find_endpoint(&catalog, "passport").unwrap_err();
        assert!(matches!(err, VerifyError::UnknownEndpoint { name } if name == "passport"));
    }

    #[test]
    fn test_fill_template() {
        let (filled, unresolved) = fill_template("https://x/companies/{cin}/details", |name| {
            (name == "cin").then(|| "U123".to_string())
        });
        assert_eq!(filled, "https://x/companies/U123/details");
        assert!(unresolved.is_empty());

        let (filled, unresolved) = fill_template("https://x/{missing}", |_| None);
        assert_eq!(filled, "https://x/{missing}");
        assert_eq!(unresolved, vec!["missing"]);
    }

    #[test]
    fn test_whole_placeholder() {
        assert_eq!(whole_placeholder("{pan}"), Some("pan"));
        assert_eq!(whole_placeholder("PAN-{pan}"), None);
        assert_eq!(whole_placeholder("{}"), None);
    }

    #[test]
    fn test_effective_options_overrides() {
        let catalog = builtin_endpoints();
        let gstin = find_endpoint(&catalog, "gstin").unwrap();
        let mut overrides = BTreeMap::new();
        overrides.insert("fetchFilings".to_string(), json!(true));
        overrides.insert("fy".to_string(), json!("2023-24"));

        let effective = gstin.effective_options(&overrides);
        assert_eq!(effective["fetchFilings"], json!(true));
        assert_eq!(effective["fy"], json!("2023-24"));
    }

    #[test]
    fn test_merged_catalog_overrides_by_name() {
        let mut custom = builtin_endpoints()
            .into_iter()
            .find(|e| e.name == "pan")
            .unwrap();
        custom.url = "https://sandbox.example.com/pan".to_string();

        let catalog = merged_catalog(&[custom]);
        let pan = find_endpoint(&catalog, "pan").unwrap();
        assert_eq!(pan.url, "https://sandbox.example.com/pan");
        assert_eq!(catalog.len(), builtin_endpoints().len());
    }
}
