//! In-game script console.
//!
//! Scripts run in a Lua state limited to the `table`, `string` and `math`
//! libraries. They never touch the session directly: the prelude functions
//! append entries to a `_commands` table, and Rust reads that table back
//! after the chunk returns. The session applies the resulting
//! `ConsoleCommand`s between ticks.
//!
//! Lua API:
//!   fly()                          -- toggle fly mode
//!   noclip()                       -- toggle collision resolution
//!   inf_jump()                     -- toggle infinite jump
//!   speed(n)                       -- set walk acceleration
//!   jump_power(n)                  -- set jump impulse
//!   spawn_custom(kind, color, size)-- spawn an object at the player
//!   respawn()                      -- send the player back to spawn
//!   print(...)                     -- write to the console log
//!   _G.InfJump = true | false      -- set infinite jump explicitly
//!
//! Globals survive between runs, like a persistent executor session. Each
//! run is limited to a fixed instruction budget.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use mlua::{HookTriggers, Lua, LuaOptions, StdLib, Table, Value, VmState};
use thiserror::Error;

use crate::world::KindTag;

/// Lines kept in the console log.
pub const LOG_CAPACITY: usize = 10;

/// Lua VM instructions between budget checks.
const HOOK_INTERVAL: u32 = 1_000;
/// Budget checks a single script may pass before it is aborted.
const MAX_HOOK_CALLS: u32 = 1_000;

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("failed to initialise Lua: {0}")]
    Init(#[source] mlua::Error),
    #[error("script error: {0}")]
    Script(#[from] mlua::Error),
    #[error("unknown object kind '{0}'")]
    UnknownKind(String),
    #[error("{name} must be a positive finite number, got {value}")]
    BadNumber { name: &'static str, value: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    ToggleFly,
    ToggleNoclip,
    ToggleInfiniteJump,
    SetInfiniteJump(bool),
    SetSpeed(f32),
    SetJumpPower(f32),
    Spawn {
        kind: KindTag,
        color: String,
        size: f32,
    },
    Respawn,
}

pub struct ScriptConsole {
    lua: Lua,
    log: VecDeque<String>,
}

impl ScriptConsole {
    pub fn new() -> Result<Self, ConsoleError> {
        let lua = Lua::new_with(
            StdLib::TABLE | StdLib::STRING | StdLib::MATH,
            LuaOptions::default(),
        )
        .map_err(ConsoleError::Init)?;
        install_prelude(&lua).map_err(ConsoleError::Init)?;
        Ok(Self {
            lua,
            log: VecDeque::with_capacity(LOG_CAPACITY),
        })
    }

    /// Run one script and return the commands it issued, in call order.
    ///
    /// A script that fails partway issues nothing: commands recorded before
    /// the error are discarded along with it.
    pub fn execute(&mut self, source: &str) -> Result<Vec<ConsoleCommand>, ConsoleError> {
        let source = source.trim();
        if source.is_empty() {
            return Ok(Vec::new());
        }

        let globals = self.lua.globals();
        globals.set("_commands", self.lua.create_table()?)?;
        globals.set("_output", self.lua.create_table()?)?;
        globals.set("InfJump", Value::Nil)?;

        let run = self.run_with_budget(source);
        self.drain_output()?;
        if let Err(err) = run {
            globals.set("InfJump", Value::Nil)?;
            self.push_log(format!("error: {err}"));
            log::warn!("Console script failed: {}", err);
            return Err(ConsoleError::Script(err));
        }

        let commands = match self.read_commands() {
            Ok(commands) => commands,
            Err(err) => {
                self.push_log(format!("error: {err}"));
                return Err(err);
            }
        };
        for command in &commands {
            log::info!("Console command: {:?}", command);
        }
        Ok(commands)
    }

    fn run_with_budget(&self, source: &str) -> mlua::Result<()> {
        let counter = AtomicU32::new(0);
        self.lua.set_hook(
            HookTriggers::new().every_nth_instruction(HOOK_INTERVAL),
            move |_lua, _debug| {
                if counter.fetch_add(1, Ordering::Relaxed) >= MAX_HOOK_CALLS {
                    return Err(mlua::Error::runtime(format!(
                        "script exceeded {} instructions",
                        HOOK_INTERVAL as u64 * MAX_HOOK_CALLS as u64
                    )));
                }
                Ok(VmState::Continue)
            },
        );
        let run = self.lua.load(source).set_name("console").exec();
        self.lua.remove_hook();
        run
    }

    /// The most recent log lines, oldest first.
    pub fn log_lines(&self) -> impl Iterator<Item = &str> {
        self.log.iter().map(String::as_str)
    }

    fn push_log(&mut self, line: String) {
        if self.log.len() == LOG_CAPACITY {
            self.log.pop_front();
        }
        self.log.push_back(line);
    }

    fn drain_output(&mut self) -> Result<(), ConsoleError> {
        let output: Table = self.lua.globals().get("_output")?;
        let lines = output
            .sequence_values::<String>()
            .collect::<mlua::Result<Vec<_>>>()?;
        for line in lines {
            self.push_log(line);
        }
        Ok(())
    }

    fn read_commands(&self) -> Result<Vec<ConsoleCommand>, ConsoleError> {
        let globals = self.lua.globals();
        let table: Table = globals.get("_commands")?;
        let mut commands = Vec::new();
        for entry in table.sequence_values::<Table>() {
            commands.push(parse_command(&entry?)?);
        }

        match globals.get::<Value>("InfJump")? {
            Value::Boolean(enabled) => {
                commands.push(ConsoleCommand::SetInfiniteJump(enabled));
                globals.set("InfJump", Value::Nil)?;
            }
            Value::Nil => {}
            other => {
                log::debug!("Ignoring InfJump of type {}", other.type_name());
            }
        }
        Ok(commands)
    }
}

fn parse_command(entry: &Table) -> Result<ConsoleCommand, ConsoleError> {
    let op: String = entry.get("op")?;
    let command = match op.as_str() {
        "fly" => ConsoleCommand::ToggleFly,
        "noclip" => ConsoleCommand::ToggleNoclip,
        "inf_jump" => ConsoleCommand::ToggleInfiniteJump,
        "respawn" => ConsoleCommand::Respawn,
        "speed" => ConsoleCommand::SetSpeed(positive("speed", entry.get("value")?)?),
        "jump_power" => {
            ConsoleCommand::SetJumpPower(positive("jump_power", entry.get("value")?)?)
        }
        "spawn" => {
            let tag: String = entry.get("kind")?;
            let kind = KindTag::parse(&tag).ok_or(ConsoleError::UnknownKind(tag))?;
            ConsoleCommand::Spawn {
                kind,
                color: entry.get("color")?,
                size: positive("size", entry.get("value")?)?,
            }
        }
        other => {
            return Err(ConsoleError::Script(mlua::Error::runtime(format!(
                "unknown console op '{other}'"
            ))))
        }
    };
    Ok(command)
}

fn positive(name: &'static str, value: f32) -> Result<f32, ConsoleError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConsoleError::BadNumber { name, value })
    }
}

fn install_prelude(lua: &Lua) -> mlua::Result<()> {
    let globals = lua.globals();
    globals.set("_commands", lua.create_table()?)?;
    globals.set("_output", lua.create_table()?)?;

    for name in ["dofile", "loadfile", "load", "require", "collectgarbage"] {
        globals.set(name, Value::Nil)?;
    }

    for op in ["fly", "noclip", "inf_jump", "respawn"] {
        let issue = lua.create_function(move |lua, ()| {
            let entry = lua.create_table()?;
            entry.set("op", op)?;
            push_command(lua, entry)
        })?;
        globals.set(op, issue)?;
    }

    for op in ["speed", "jump_power"] {
        let issue = lua.create_function(move |lua, value: f32| {
            let entry = lua.create_table()?;
            entry.set("op", op)?;
            entry.set("value", value)?;
            push_command(lua, entry)
        })?;
        globals.set(op, issue)?;
    }

    let spawn_custom = lua.create_function(
        |lua, (kind, color, size): (String, Option<String>, Option<f32>)| {
            let entry = lua.create_table()?;
            entry.set("op", "spawn")?;
            entry.set("kind", kind)?;
            entry.set("color", color.unwrap_or_else(|| "#FF0000".to_string()))?;
            entry.set("value", size.unwrap_or(2.0))?;
            push_command(lua, entry)
        },
    )?;
    globals.set("spawn_custom", spawn_custom)?;

    let print = lua.create_function(|lua, args: mlua::Variadic<Value>| {
        let parts = args
            .iter()
            .map(display_value)
            .collect::<Vec<_>>();
        let output: Table = lua.globals().get("_output")?;
        output.raw_push(parts.join("\t"))?;
        Ok(())
    })?;
    globals.set("print", print)?;

    Ok(())
}

fn push_command(lua: &Lua, entry: Table) -> mlua::Result<()> {
    let commands: Table = lua.globals().get("_commands")?;
    commands.raw_push(entry)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Nil => "nil".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.to_string_lossy().to_string(),
        other => other.type_name().to_string(),
    }
}
