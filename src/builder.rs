//! IR → operation table
//!
//! Converts the actions of an [`ApiSpec`] into callable [`Operation`]s keyed
//! by their synthesized names. Pure transformation, no network access.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use textwrap::Options;

use crate::client::Endpoint;
use crate::error::Error;
use crate::spec::{self, ApiSpec, ParameterDescriptor};
use crate::transport::Transport;

/// The credential-issuing action, callable without an API key.
pub const BOOTSTRAP_ACTION: &str = "user.getapikey";

const DESCRIPTION_WIDTH: usize = 70;
const PARAMETER_WIDTH: usize = 66;

/// One synthesized operation bound to a remote action.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Operation {
    /// Synthesized name (e.g. "linode_list")
    pub name: String,
    /// Remote action sent as `api_action` (e.g. "linode.list")
    pub action: String,
    /// Parameter names the caller must supply
    pub required: BTreeSet<String>,
    /// All declared parameters, for introspection
    pub parameters: BTreeMap<String, ParameterDescriptor>,
    /// Help text assembled from the spec
    pub doc: String,
}

impl Operation {
    /// Whether this is the credential-issuing bootstrap operation.
    pub fn is_bootstrap(&self) -> bool {
        self.action == BOOTSTRAP_ACTION
    }
}

/// Immutable table of every operation the spec describes.
#[derive(Debug, Clone, Default)]
pub struct OperationTable {
    version: String,
    operations: HashMap<String, Operation>,
}

impl OperationTable {
    /// Fetch the spec from `endpoint` and synthesize its operations.
    pub fn fetch(transport: &impl Transport, endpoint: &Endpoint) -> Result<Self, Error> {
        let spec = spec::fetch(transport, endpoint).map_err(Error::SpecUnavailable)?;
        Ok(synthesize(spec))
    }

    /// Spec version the table was built from.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn get(&self, name: &str) -> Option<&Operation> {
        self.operations.get(name)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Operations in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        let mut ops: Vec<&Operation> = self.operations.values().collect();
        ops.sort_by(|a, b| a.name.cmp(&b.name));
        ops.into_iter()
    }
}

/// Build one operation per action.
///
/// Actions are visited in name order. When two actions map to the same
/// operation name, the one visited last replaces the earlier one.
pub fn synthesize(spec: ApiSpec) -> OperationTable {
    let mut operations = HashMap::with_capacity(spec.actions.len());

    for (action, descriptor) in spec.actions {
        let name = operation_name(&action);
        let required = descriptor
            .parameters
            .iter()
            .filter(|(_, p)| p.required)
            .map(|(p, _)| p.clone())
            .collect();
        let doc = build_doc(&descriptor.description, &descriptor.parameters, &descriptor.throws);

        let op = Operation {
            name: name.clone(),
            action,
            required,
            parameters: descriptor.parameters,
            doc,
        };

        if let Some(previous) = operations.insert(name.clone(), op) {
            tracing::warn!(
                operation = %name,
                replaced = %previous.action,
                "API spec defines colliding operation names"
            );
        }
    }

    OperationTable {
        version: spec.version,
        operations,
    }
}

/// `"linode.disk.list"` → `"linode_disk_list"`
pub fn operation_name(action: &str) -> String {
    action.replace('.', "_")
}

/// Assemble help text: wrapped description, parameter listing, error codes.
pub fn build_doc(
    description: &str,
    parameters: &BTreeMap<String, ParameterDescriptor>,
    throws: &BTreeSet<String>,
) -> String {
    // textwrap yields one empty line for blank input; a blank description has none
    let mut lines: Vec<String> = if description.trim().is_empty() {
        Vec::new()
    } else {
        textwrap::wrap(description, DESCRIPTION_WIDTH)
            .into_iter()
            .map(|l| l.into_owned())
            .collect()
    };

    if !parameters.is_empty() {
        lines.extend([String::new(), "Parameters:".to_string(), String::new()]);

        let options = Options::new(PARAMETER_WIDTH)
            .initial_indent("    ")
            .subsequent_indent("       ");

        for (name, param) in parameters {
            let mut entry = format!("- `{name}`: {}", param.description);
            if !param.required {
                entry.push_str(" (optional)");
            }
            lines.extend(
                textwrap::wrap(&entry, &options)
                    .into_iter()
                    .map(|l| l.into_owned()),
            );
        }
    }

    if !throws.is_empty() {
        lines.push(String::new());
        for code in throws {
            lines.push(format!("Errors: {code}"));
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::ActionDescriptor;
    use crate::transport::stub::StubTransport;
    use serde_json::json;

    fn sample_spec() -> ApiSpec {
        ApiSpec::new("2.3")
            .action(
                ActionDescriptor::new("user.getapikey", "Returns an API key.")
                    .param("username", "The username", true)
                    .param("password", "The password", true),
            )
            .action(
                ActionDescriptor::new("linode.disk.list", "Lists disks.")
                    .param("LinodeID", "The Linode", true)
                    .param("DiskID", "Limit to one disk", false)
                    .throws("NOTFOUND"),
            )
            .action(ActionDescriptor::new("test.echo", "Echoes parameters."))
    }

    // -- operation_name --

    #[test]
    fn operation_name_replaces_every_dot() {
        assert_eq!(operation_name("linode.disk.list"), "linode_disk_list");
    }

    #[test]
    fn operation_name_without_dots_is_unchanged() {
        assert_eq!(operation_name("ping"), "ping");
    }

    // -- synthesize --

    #[test]
    fn synthesize_creates_one_operation_per_action() {
        let table = synthesize(sample_spec());
        assert_eq!(table.version(), "2.3");
        assert_eq!(table.len(), 3);

        let names: Vec<&str> = table.iter().map(|op| op.name.as_str()).collect();
        assert_eq!(names, vec!["linode_disk_list", "test_echo", "user_getapikey"]);

        for op in table.iter() {
            assert_eq!(op.name, operation_name(&op.action));
        }
    }

    #[test]
    fn synthesize_collects_required_parameters() {
        let table = synthesize(sample_spec());
        let op = table.get("linode_disk_list").unwrap();
        assert_eq!(op.action, "linode.disk.list");
        assert_eq!(op.required, BTreeSet::from(["LinodeID".to_string()]));
        assert_eq!(op.parameters.len(), 2);
        assert!(!op.is_bootstrap());
    }

    #[test]
    fn synthesize_marks_bootstrap_operation() {
        let table = synthesize(sample_spec());
        assert!(table.get("user_getapikey").unwrap().is_bootstrap());
    }

    #[test]
    fn synthesize_collision_keeps_later_action() {
        // '.' sorts before '_', so "user_getapikey" is visited after "user.getapikey"
        let spec = ApiSpec::new("1")
            .action(ActionDescriptor::new("user.getapikey", "dotted"))
            .action(ActionDescriptor::new("user_getapikey", "underscored"));

        let table = synthesize(spec);
        assert_eq!(table.len(), 1);
        let op = table.get("user_getapikey").unwrap();
        assert_eq!(op.action, "user_getapikey");
        assert_eq!(op.doc, "underscored");
    }

    #[test]
    fn synthesize_empty_spec_yields_empty_table() {
        let table = synthesize(ApiSpec::new("1"));
        assert!(table.is_empty());
        assert!(table.get("test_echo").is_none());
    }

    // -- build_doc --

    #[test]
    fn build_doc_lists_parameters_and_errors() {
        let table = synthesize(sample_spec());
        let doc = &table.get("linode_disk_list").unwrap().doc;
        let expected = "Lists disks.\n\
                        \n\
                        Parameters:\n\
                        \n    \
                        - `DiskID`: Limit to one disk (optional)\n    \
                        - `LinodeID`: The Linode\n\
                        \n\
                        Errors: NOTFOUND";
        assert_eq!(doc, expected);
    }

    #[test]
    fn build_doc_description_only() {
        let doc = build_doc("Echoes parameters.", &BTreeMap::new(), &BTreeSet::new());
        assert_eq!(doc, "Echoes parameters.");
    }

    #[test]
    fn build_doc_blank_description_adds_no_lines() {
        assert_eq!(build_doc("", &BTreeMap::new(), &BTreeSet::new()), "");
        assert_eq!(build_doc("   ", &BTreeMap::new(), &BTreeSet::new()), "");

        let throws = BTreeSet::from(["NOTFOUND".to_string()]);
        assert_eq!(build_doc("", &BTreeMap::new(), &throws), "\nErrors: NOTFOUND");
    }

    #[test]
    fn synthesize_blank_description_doc_starts_with_parameters() {
        let spec = ApiSpec::new("1").action(ActionDescriptor::new("test.echo", "").param(
            "x",
            "Value",
            true,
        ));
        let table = synthesize(spec);
        let doc = &table.get("test_echo").unwrap().doc;
        assert_eq!(doc, "\nParameters:\n\n    - `x`: Value");
    }

    #[test]
    fn build_doc_wraps_long_text() {
        let description = "word ".repeat(40);
        let mut params = BTreeMap::new();
        params.insert(
            "p".to_string(),
            ParameterDescriptor {
                description: "detail ".repeat(20),
                required: true,
            },
        );

        let doc = build_doc(&description, &params, &BTreeSet::new());
        let lines: Vec<&str> = doc.lines().collect();

        assert!(lines.iter().all(|l| l.len() <= DESCRIPTION_WIDTH));
        let param_lines: Vec<&&str> = lines.iter().skip_while(|l| !l.contains("`p`")).collect();
        assert!(param_lines.len() > 1, "parameter entry should wrap");
        assert!(param_lines[0].starts_with("    - `p`"));
        assert!(param_lines[1].starts_with("       "));
        assert!(param_lines.iter().all(|l| l.len() <= PARAMETER_WIDTH));
    }

    // -- OperationTable::fetch --

    #[test]
    fn fetch_synthesizes_table_from_remote_spec() {
        let transport = StubTransport::new().respond(
            200,
            json!({
                "DATA": {
                    "VERSION": "2.3",
                    "METHODS": {
                        "test.echo": { "DESCRIPTION": "Echo", "PARAMETERS": {}, "THROWS": "" }
                    }
                },
                "ERRORARRAY": []
            }),
        );

        let table = OperationTable::fetch(&transport, &Endpoint::default()).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.get("test_echo").is_some());
    }

    #[test]
    fn fetch_server_error_is_spec_unavailable() {
        let transport = StubTransport::new().respond_raw(500, "oops");
        let err = OperationTable::fetch(&transport, &Endpoint::default()).unwrap_err();
        assert!(matches!(err, Error::SpecUnavailable(_)));
        assert_eq!(err.to_string(), "API spec unavailable");
    }

    #[test]
    fn fetch_missing_version_is_spec_unavailable() {
        let transport =
            StubTransport::new().respond(200, json!({ "DATA": { "METHODS": {} } }));
        let err = OperationTable::fetch(&transport, &Endpoint::default()).unwrap_err();
        assert!(matches!(err, Error::SpecUnavailable(_)));
    }
}
