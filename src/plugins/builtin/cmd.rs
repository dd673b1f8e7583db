//! `cmd` - add, edit and delete commands from chat

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use crate::application::errors::{CommandError, ModuleError};
use crate::application::messaging::template::is_identifier;
use crate::domain::entities::{Message, Privilege, DEFAULT_COOLDOWN, MAX_COOLDOWN};
use crate::domain::traits::SessionControl;
use crate::plugins::config::ModuleConfig;
use crate::plugins::{Arity, Module, ModuleContext};

const INVALID_NAME: &str = "Command name can only use lowercase alphanumeric characters and underscores (_).";

pub struct Cmd {
    ctx: ModuleContext,
    modonly_arg: String,
    hidden_arg: String,
    default_cooldown: i64,
}

pub fn create(ctx: ModuleContext) -> Result<Arc<dyn Module>, ModuleError> {
    let config: ModuleConfig = ctx.load_config(json!({
        "modonly_arg": "-modonly",
        "hidden_arg": "-hidden",
        "default_cooldown": DEFAULT_COOLDOWN,
    }))?;

    Ok(Arc::new(Cmd {
        modonly_arg: config.get_as("modonly_arg").unwrap_or_else(|| "-modonly".to_string()),
        hidden_arg: config.get_as("hidden_arg").unwrap_or_else(|| "-hidden".to_string()),
        default_cooldown: config.get_as("default_cooldown").unwrap_or(DEFAULT_COOLDOWN as i64),
        ctx,
    }))
}

impl Cmd {
    fn add(&self, session: &dyn SessionControl, name: &str, mut rest: Vec<String>) -> Result<String, ModuleError> {
        if rest.is_empty() {
            return Ok("Not enough parameters given.".to_string());
        }

        let cooldown = match rest[0].parse::<i64>() {
            Ok(cooldown) => {
                rest.remove(0);
                cooldown
            }
            Err(_) => self.default_cooldown,
        };

        // Flags may come in either order
        let mut modonly = false;
        let mut hidden = false;
        while let Some(flag) = rest.first().map(|f| f.to_lowercase()) {
            if flag == self.modonly_arg {
                modonly = true;
            } else if flag == self.hidden_arg {
                hidden = true;
            } else {
                break;
            }
            rest.remove(0);
        }

        if !is_identifier(name) {
            return Ok(INVALID_NAME.to_string());
        }
        if !(0..=MAX_COOLDOWN as i64).contains(&cooldown) {
            return Ok(format!("Command cooldown must be between 0 and {} seconds.", MAX_COOLDOWN));
        }

        let privilege = if modonly { Privilege::Mod } else { Privilege::User };
        match session.commands().add(name, cooldown, &rest.join(" "), privilege, hidden) {
            Ok(()) => {
                self.save(session)?;
                Ok(format!("Command {} added successfully.", name))
            }
            Err(CommandError::Module(ModuleError::NotFound(module))) => {
                Ok(format!("Module {} does not exist in the modules folder.", module))
            }
            Err(CommandError::Module(ModuleError::Invalid(module))) => {
                Ok(format!("Module {} does not have a module entry point to import.", module))
            }
            Err(e) => Ok(e.to_string()),
        }
    }

    fn delete(&self, session: &dyn SessionControl, name: &str) -> Result<String, ModuleError> {
        if session.commands().delete(name).is_err() {
            return Ok(format!("Command {} does not exist!", name));
        }
        self.save(session)?;
        Ok(format!("Command {} removed successfully.", name))
    }

    fn edit(&self, session: &dyn SessionControl, name: &str, mut rest: Vec<String>) -> Result<String, ModuleError> {
        let Some(command) = session.commands().get(name) else {
            return Ok(format!("Command {} does not exist!", name));
        };
        if rest.is_empty() {
            return Ok("Not enough parameters.".to_string());
        }

        let key = rest.remove(0).to_lowercase();
        let reply = match key.as_str() {
            "cd" | "cooldown" => match rest.first().and_then(|v| v.parse::<i64>().ok()) {
                Some(value) if (0..=MAX_COOLDOWN as i64).contains(&value) => {
                    self.modify(session, name, "cooldown", &value.to_string())?;
                    format!("Cooldown for {} set to {}.", name, value)
                }
                _ => return Ok(format!("Cooldown must be between 0 and {} seconds.", MAX_COOLDOWN)),
            },
            "name" | "rename" => {
                let Some(new_name) = rest.first().map(|n| n.to_lowercase()) else {
                    return Ok(INVALID_NAME.to_string());
                };
                match session.commands().rename(name, &new_name) {
                    Ok(()) => format!("Command {} renamed to {}.", name, new_name),
                    Err(CommandError::InvalidName(_)) => return Ok(INVALID_NAME.to_string()),
                    Err(e) => return Ok(e.to_string()),
                }
            }
            "res" | "response" => {
                if rest.is_empty() {
                    return Ok("Response cannot be empty.".to_string());
                }
                let value = rest.join(" ");
                self.modify(session, name, "response", &value)?;
                format!("Response for {} set to {}.", name, value)
            }
            "mod" | "requires_mod" => {
                let value = command.privilege < Privilege::Mod;
                self.modify(session, name, "privilege", &value.to_string())?;
                format!("Mod requirement for {} toggled to {}.", name, value)
            }
            "priv" | "privilege" => match rest.first().map(|p| p.parse::<Privilege>()) {
                Some(Ok(value)) => {
                    self.modify(session, name, "privilege", value.as_str())?;
                    format!("Privilege for {} set to {}.", name, value)
                }
                _ => return Ok("Valid privileges are: user, sub, vip, mod, host.".to_string()),
            },
            "hide" | "hidden" => {
                let value = !command.hidden;
                self.modify(session, name, "hidden", &value.to_string())?;
                format!("Hiding from help for {} toggled to {}.", name, value)
            }
            _ => return Ok("Valid fields to modify are: cooldown, name, response, requires_mod, privilege, hidden".to_string()),
        };

        self.save(session)?;
        Ok(reply)
    }

    fn modify(&self, session: &dyn SessionControl, name: &str, field: &str, value: &str) -> Result<(), ModuleError> {
        session
            .commands()
            .modify(name, field, value)
            .map_err(|e| match e {
                CommandError::Module(inner) => inner,
                other => ModuleError::failed(self.name(), other),
            })
    }

    fn save(&self, session: &dyn SessionControl) -> Result<(), ModuleError> {
        session.save().map_err(|e| ModuleError::failed(self.name(), e))
    }
}

#[async_trait]
impl Module for Cmd {
    fn name(&self) -> &str {
        self.ctx.name()
    }

    fn help(&self) -> String {
        "Add, modify, or delete a command. Usage: cmd <add/del/edit> <name> <args?>".to_string()
    }

    fn arity(&self) -> Arity {
        Arity::All
    }

    fn main(&self, _message: &Message, mut args: Vec<String>) -> Result<String, ModuleError> {
        if args.len() < 2 {
            return Ok("Not enough parameters given.".to_string());
        }

        let action = args.remove(0).to_lowercase();
        let name = args.remove(0).to_lowercase();
        let session = self.ctx.session()?;

        match action.as_str() {
            "+" | "a" | "add" | "create" | "new" | "make" | "mk" => self.add(session.as_ref(), &name, args),
            "-" | "d" | "delete" | "del" | "remove" | "rem" | "rm" => self.delete(session.as_ref(), &name),
            "e" | "modify" | "mod" | "edit" => self.edit(session.as_ref(), &name, args),
            _ => Ok("Valid actions are: add, remove, edit.".to_string()),
        }
    }
}
