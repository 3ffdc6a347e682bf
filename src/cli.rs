//! Operation table → clap Command tree
//!
//! An optional front end: every synthesized operation becomes a subcommand,
//! grouped by the first segment of its action name.

use std::collections::{BTreeMap, HashMap};

use clap::{Arg, ArgAction, ArgMatches, Command};
use serde_json::Value;

use crate::builder::{Operation, OperationTable};
use crate::client::{Client, Endpoint};
use crate::dispatch::{Args, Envelope};
use crate::error::Error;
use crate::transport::Transport;

/// Configuration for building a CLI from an operation table.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct CliConfig {
    /// Root command name (e.g. "linode")
    pub name: String,
    /// Root command about/description
    pub about: String,
    /// Default base URL for the API
    pub default_base_url: String,
}

impl CliConfig {
    pub fn new(
        name: impl Into<String>,
        about: impl Into<String>,
        default_base_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            about: about.into(),
            default_base_url: default_base_url.into(),
        }
    }
}

/// Split an action into (group, command): `"linode.disk.list"` → `("linode", "disk-list")`.
///
/// Single-segment actions land in the "other" group.
pub fn command_path(action: &str) -> (String, String) {
    match action.split_once('.') {
        Some((group, rest)) if !group.is_empty() && !rest.is_empty() => {
            (group.to_string(), rest.replace('.', "-"))
        }
        _ => ("other".to_string(), action.replace('.', "-")),
    }
}

/// Argument ids owned by clap or by the global flags.
const RESERVED_ARGS: [&str; 4] = ["help", "version", "api-key", "base-url"];

/// Option name for a parameter: `"LinodeID"` → `--LinodeID`, `"help"` → `--param-help`.
pub fn arg_name(param: &str) -> String {
    if RESERVED_ARGS.contains(&param) {
        format!("param-{param}")
    } else {
        param.to_string()
    }
}

/// Every operation with its (group, command) names, grouped by name.
///
/// Commands that clash inside a group are suffixed with the operation name.
fn command_table(table: &OperationTable) -> BTreeMap<String, Vec<(String, &Operation)>> {
    let mut groups: BTreeMap<String, Vec<(String, &Operation)>> = BTreeMap::new();
    for op in table.iter() {
        let (group, cmd) = command_path(&op.action);
        groups.entry(group).or_default().push((cmd, op));
    }

    for group_ops in groups.values_mut() {
        // Detect duplicate names within this group
        let mut name_count: HashMap<String, usize> = HashMap::new();
        for (cmd, _) in group_ops.iter() {
            *name_count.entry(cmd.clone()).or_default() += 1;
        }

        for (cmd, op) in group_ops.iter_mut() {
            if name_count.get(cmd.as_str()).copied().unwrap_or(0) > 1 {
                *cmd = format!("{cmd}-{}", op.name.replace('_', "-"));
            }
        }
    }

    groups
}

/// Build a clap `Command` tree from an operation table.
///
/// Structure: `<name> <group> <command> [--param value]...`
pub fn build_commands(config: &CliConfig, table: &OperationTable) -> Command {
    let mut root = Command::new(config.name.clone())
        .about(config.about.clone())
        .version(table.version().to_string())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("base-url")
                .long("base-url")
                .global(true)
                .default_value(config.default_base_url.clone())
                .help("API base URL"),
        )
        .arg(
            Arg::new("api-key")
                .long("api-key")
                .global(true)
                .action(ArgAction::Set)
                .help("API key (omit to call user getapikey first)"),
        );

    for (group_name, group_ops) in command_table(table) {
        let mut group_cmd = Command::new(group_name.clone())
            .about(format!("{group_name} actions"))
            .subcommand_required(true)
            .arg_required_else_help(true);

        for (cmd_name, op) in group_ops {
            group_cmd = group_cmd.subcommand(build_operation_command(op, cmd_name));
        }

        root = root.subcommand(group_cmd);
    }

    root
}

fn build_operation_command(op: &Operation, cmd_name: String) -> Command {
    let about = op.doc.lines().next().unwrap_or("").to_string();
    let mut cmd = Command::new(cmd_name)
        .about(about)
        .long_about(op.doc.clone());

    for (name, param) in &op.parameters {
        let arg_name = arg_name(name);
        cmd = cmd.arg(
            Arg::new(arg_name.clone())
                .long(arg_name)
                .help(param.description.clone())
                .required(param.required)
                .action(ArgAction::Set),
        );
    }

    cmd
}

/// Find the operation behind a resolved group + command name.
pub fn find_operation<'a>(
    table: &'a OperationTable,
    group_name: &str,
    cmd_name: &str,
) -> Option<&'a Operation> {
    command_table(table)
        .remove(group_name)?
        .into_iter()
        .find(|(cmd, _)| cmd == cmd_name)
        .map(|(_, op)| op)
}

/// Collect parameter values from matches.
///
/// Values are parsed as JSON where possible, falling back to plain strings.
pub fn collect_args(op: &Operation, matches: &ArgMatches) -> Args {
    let mut args = Args::new();
    for name in op.parameters.keys() {
        if let Some(val) = matches.get_one::<String>(&arg_name(name)) {
            let json_val = serde_json::from_str(val).unwrap_or(Value::String(val.clone()));
            args.insert(name.clone(), json_val);
        }
    }
    args
}

/// Resolve the chosen subcommand and invoke it on `client`.
///
/// `--base-url` (or its default) replaces the client's endpoint and
/// `--api-key`, when given, replaces its credential.
pub fn dispatch_matches<T: Transport>(
    client: &mut Client<T>,
    matches: &ArgMatches,
) -> Result<Envelope, Error> {
    let (group_name, group_matches) = matches
        .subcommand()
        .ok_or_else(|| Error::UnknownOperation {
            name: String::new(),
        })?;
    let (cmd_name, cmd_matches) = group_matches
        .subcommand()
        .ok_or_else(|| Error::UnknownOperation {
            name: group_name.to_string(),
        })?;

    let op = find_operation(client.operations(), group_name, cmd_name).ok_or_else(|| {
        Error::UnknownOperation {
            name: format!("{group_name} {cmd_name}"),
        }
    })?;
    let name = op.name.clone();
    let args = collect_args(op, cmd_matches);

    if let Some(base_url) = matches.get_one::<String>("base-url") {
        client.set_endpoint(Endpoint::new(base_url.clone()));
    }
    if let Some(key) = matches.get_one::<String>("api-key") {
        client.set_api_key(Some(key.clone()));
    }

    client.invoke(&name, &args)
}
