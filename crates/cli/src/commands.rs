//! Subcommand implementations
//!
//! Every command writes plain text (or JSON) to the given writer so that
//! tests can capture it.

use std::io::Write;
use std::path::Path;

use groupperms_core::config::{permissions_path, settings_path};
use groupperms_core::{EngineConfig, PermissionMap, Permissions, SubjectId, TomlStore};

use crate::cli::Command;
use crate::error::{CliError, CliResult};

/// Load the engine settings from `dir`, creating them if missing
pub fn load_settings(dir: &Path) -> CliResult<EngineConfig> {
    Ok(EngineConfig::load(settings_path(dir))?)
}

/// Open the permissions document named by `config`
pub fn open_engine(dir: &Path, config: EngineConfig) -> CliResult<Permissions<TomlStore>> {
    let store = TomlStore::open_or_create(permissions_path(dir, &config))?;
    Ok(Permissions::new(store, config))
}

pub fn run(engine: &Permissions<TomlStore>, command: &Command, out: &mut dyn Write) -> CliResult<()> {
    match command {
        Command::Resolve {
            subject,
            world,
            json,
        } => {
            let perms = engine.resolve_subject(&SubjectId::new(subject), world.as_deref())?;
            if *json {
                writeln!(out, "{}", serde_json::to_string_pretty(&perms)?)?;
            } else {
                print_map(&perms, out)?;
            }
        }
        Command::Group { name, world } => {
            let Some(info) = engine.group(name)? else {
                return Err(CliError::NoSuchGroup(name.clone()));
            };
            if !info.inheritance.is_empty() {
                writeln!(out, "# inherits: {}", info.inheritance.join(", "))?;
            }
            print_map(&engine.resolve_group(&info.name, world.as_deref())?, out)?;
        }
        Command::Closure { group } => {
            let mut closure: Vec<String> = engine.inheritance_closure(group)?.into_iter().collect();
            closure.sort();
            print_lines(&closure, out)?;
        }
        Command::Groups => {
            print_lines(&engine.group_names()?, out)?;
        }
        Command::Members { group } => {
            for member in engine.group_members(group)? {
                writeln!(out, "{}", member)?;
            }
        }
        Command::Check {
            subject,
            node,
            world,
        } => {
            let perms = engine.resolve_subject(&SubjectId::new(subject), world.as_deref())?;
            match perms.get(node) {
                Some(value) => writeln!(out, "{} = {}", node, value)?,
                None => writeln!(out, "{} is not set", node)?,
            }
        }
    }
    Ok(())
}

fn print_map(perms: &PermissionMap, out: &mut dyn Write) -> CliResult<()> {
    for (node, value) in perms.iter() {
        writeln!(out, "{} = {}", node, value)?;
    }
    Ok(())
}

fn print_lines(lines: &[String], out: &mut dyn Write) -> CliResult<()> {
    for line in lines {
        writeln!(out, "{}", line)?;
    }
    Ok(())
}
