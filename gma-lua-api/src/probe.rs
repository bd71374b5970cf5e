//! Dry-run host for console scripts.
//!
//! [`ProbeRuntime`] installs a stand-in for every namespace of an
//! [`ApiRegistry`] into a Luau state. Each function checks its arguments
//! against the declared overloads and answers with a placeholder of the
//! declared return type, so a script can be run end to end off the console.
//!
//! # Timeout protection
//!
//! Runs are bounded by a wall-clock deadline checked from Luau's
//! `set_interrupt` callback, which fires at function calls and loop
//! iterations even in optimized code.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use log::{debug, info};
use mlua::prelude::*;
use mlua::Compiler;
use serde::Serialize;

use crate::api_registry::ApiRegistry;
use crate::value_types::{Primitive, ReturnType, ValueType};

/// Wall-clock limit for a single probe run.
#[derive(Debug, Clone)]
pub struct ExecutionLimits {
    /// Maximum run time (Duration::ZERO = unlimited).
    pub timeout: Duration,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(1),
        }
    }
}

impl ExecutionLimits {
    /// No timeout. Only for scripts known to terminate.
    pub fn unlimited() -> Self {
        Self {
            timeout: Duration::ZERO,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

/// One host call made by a probed script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedCall {
    pub path: String,
    pub args: Vec<ValueType>,
    /// The overload the call dispatched to
    pub signature: String,
}

/// Luau state with the registry's functions replaced by recording stand-ins.
pub struct ProbeRuntime {
    lua: Lua,
    calls: Rc<RefCell<Vec<RecordedCall>>>,
    limits: ExecutionLimits,
    /// Shared deadline for the interrupt callback (None = no active run)
    deadline: Rc<Cell<Option<Instant>>>,
    compiler: Compiler,
}

impl ProbeRuntime {
    pub fn new(registry: Rc<ApiRegistry>, limits: ExecutionLimits) -> LuaResult<Self> {
        let lua = Lua::new();
        lua.load_std_libs(LuaStdLib::ALL_SAFE)?;

        let deadline = Rc::new(Cell::new(None::<Instant>));
        if limits.timeout > Duration::ZERO {
            let deadline_clone = deadline.clone();
            lua.set_interrupt(move |_lua| {
                if let Some(dl) = deadline_clone.get() {
                    if Instant::now() > dl {
                        return Err(LuaError::external("Script execution timeout"));
                    }
                }
                Ok(LuaVmState::Continue)
            });
        }

        let calls = Rc::new(RefCell::new(Vec::new()));
        install(&lua, &registry, &calls)?;

        Ok(Self {
            lua,
            calls,
            limits,
            deadline,
            compiler: Compiler::new().set_optimization_level(2).set_debug_level(1),
        })
    }

    pub fn limits(&self) -> &ExecutionLimits {
        &self.limits
    }

    /// Compile and run `code` as a chunk called `name`.
    pub fn run(&self, code: &str, name: &str) -> LuaResult<()> {
        let bytecode = self.compiler.compile(code)?;

        if self.limits.timeout > Duration::ZERO {
            self.deadline.set(Some(Instant::now() + self.limits.timeout));
        }
        let result = self.lua.load(bytecode).set_name(name).exec();
        self.deadline.set(None);
        result
    }

    /// Host calls made so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn lua(&self) -> &Lua {
        &self.lua
    }
}

fn install(
    lua: &Lua,
    registry: &Rc<ApiRegistry>,
    calls: &Rc<RefCell<Vec<RecordedCall>>>,
) -> LuaResult<()> {
    let mut tables: HashMap<&str, LuaTable> = HashMap::new();

    for ns in registry.namespaces() {
        let table = lua.create_table()?;

        for name in ns.function_names() {
            let path = format!("{}.{}", ns.path, name);
            let function = stand_in(lua, registry.clone(), calls.clone(), path)?;
            table.set(name, function)?;
        }

        match ns.parent() {
            Some(parent) => {
                let parent = tables.get(parent).ok_or_else(|| {
                    LuaError::external(format!("namespace {} has no parent table", ns.path))
                })?;
                parent.set(ns.name(), table.clone())?;
            }
            None => lua.globals().set(ns.path.as_str(), table.clone())?,
        }
        tables.insert(ns.path.as_str(), table);
    }

    debug!("installed {} probe namespaces", tables.len());
    Ok(())
}

fn stand_in(
    lua: &Lua,
    registry: Rc<ApiRegistry>,
    calls: Rc<RefCell<Vec<RecordedCall>>>,
    path: String,
) -> LuaResult<LuaFunction> {
    lua.create_function(move |lua, args: LuaMultiValue| {
        let types: Vec<ValueType> = args.iter().map(value_type_of).collect();
        let signature = registry.resolve(&path, &types).map_err(LuaError::external)?;

        if let Some(op) = signature.operator {
            return Err(LuaError::external(format!(
                "{path} is an operator marker and must be translated to `{}` before running",
                op.rewrite("left", "right")
            )));
        }

        if path == "gma.echo" || path == "gma.feedback" {
            let tostring: LuaFunction = lua.globals().get("tostring")?;
            let mut parts = Vec::new();
            for value in args.iter() {
                parts.push(tostring.call::<String>(value.clone())?);
            }
            info!("{}: {}", signature.name, parts.join("\t"));
        }

        calls.borrow_mut().push(RecordedCall {
            path: path.clone(),
            args: types,
            signature: signature.to_string(),
        });

        placeholder(lua, signature.returns)
    })
}

fn value_type_of(value: &LuaValue) -> ValueType {
    match value {
        LuaValue::Nil => ValueType::NIL,
        LuaValue::Boolean(_) => ValueType::BOOLEAN,
        LuaValue::Integer(_) | LuaValue::Number(_) => ValueType::NUMBER,
        LuaValue::String(_) => ValueType::STRING,
        LuaValue::Table(_) => ValueType::TABLE,
        LuaValue::Function(_) => ValueType::FUNCTION,
        _ => ValueType::ANY,
    }
}

/// Stand-in result for a declared return type.
///
/// Nilable queries answer "absent"; commands answer success (an empty message).
fn placeholder(lua: &Lua, returns: ReturnType) -> LuaResult<LuaValue> {
    let ty = match returns {
        ReturnType::Nothing | ReturnType::Nilable(_) => return Ok(LuaValue::Nil),
        ReturnType::Value(ty) => ty,
    };
    Ok(match ty.base() {
        Primitive::Boolean => LuaValue::Boolean(true),
        Primitive::Number => LuaValue::Number(0.0),
        Primitive::String => LuaValue::String(lua.create_string("")?),
        Primitive::Table => LuaValue::Table(lua.create_table()?),
        Primitive::Function => LuaValue::Function(lua.create_function(|_, ()| Ok(()))?),
        Primitive::Any | Primitive::Nil => LuaValue::Nil,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime() -> ProbeRuntime {
        let registry = Rc::new(ApiRegistry::gma2().unwrap());
        ProbeRuntime::new(registry, ExecutionLimits::default()).unwrap()
    }

    #[test]
    fn namespaces_are_installed() {
        let rt = runtime();
        rt.run(
            r#"
            assert(type(gma) == "table")
            assert(type(gma.show.getobj.handle) == "function")
            assert(type(gma.gui.progress.start) == "function")
            assert(type(Lua.Modulo) == "function")
            "#,
            "install",
        )
        .unwrap();
        assert!(rt.calls().is_empty());
    }

    #[test]
    fn placeholders_follow_declared_returns() {
        let rt = runtime();
        rt.run(
            r#"
            local h = gma.show.getobj.handle("Sequence 1")
            assert(h == 0)
            assert(gma.show.getobj.label(h) == nil)
            assert(gma.show.getobj.name(h) == "")
            assert(gma.cmd("Go Executor 1") == "")
            assert(gma.gui.confirm("Title", "Sure?") == true)
            assert(type(gma.network.gethostdata("10.0.0.1")) == "table")
            assert(gma.sleep(0.1) == nil)
            "#,
            "placeholders",
        )
        .unwrap();
    }

    #[test]
    fn calls_are_recorded_with_their_overload() {
        let rt = runtime();
        rt.run(
            r#"
            local h = gma.show.getobj.handle("Sequence 1")
            gma.show.getobj.handle(h)
            gma.show.getdmx({}, 1, 512)
            "#,
            "record",
        )
        .unwrap();

        let calls = rt.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].path, "gma.show.getobj.handle");
        assert_eq!(calls[0].signature, "gma.show.getobj.handle(name: string): handle");
        assert_eq!(calls[1].signature, "gma.show.getobj.handle(handle: handle): handle");
        assert_eq!(calls[2].args.len(), 3);

        rt.clear_calls();
        assert!(rt.calls().is_empty());
    }

    #[test]
    fn wrong_arguments_raise() {
        let rt = runtime();
        let err = rt.run("gma.show.getdmx('one')", "bad").unwrap_err();
        assert!(err.to_string().contains("no overload"), "{err}");

        let err = rt.run("gma.gui.confirm('only title')", "bad").unwrap_err();
        assert!(err.to_string().contains("gma.gui.confirm"), "{err}");
    }

    #[test]
    fn optional_arguments_may_be_nil() {
        let rt = runtime();
        rt.run("gma.network.gethostdata('10.0.0.1', nil)", "nil").unwrap();
        rt.run("gma.textinput('Name')", "omitted").unwrap();
    }

    #[test]
    fn markers_refuse_to_run() {
        let rt = runtime();
        let err = rt.run("local x = Lua.Modulo(7, 3)", "marker").unwrap_err();
        assert!(err.to_string().contains("left % right"), "{err}");
    }

    #[test]
    fn echo_accepts_anything() {
        let rt = runtime();
        rt.run("gma.echo('a', 1, nil, {}, true)", "echo").unwrap();
        rt.run("gma.feedback()", "feedback").unwrap();
        assert_eq!(rt.calls().len(), 2);
    }

    #[test]
    fn runaway_scripts_time_out() {
        let registry = Rc::new(ApiRegistry::gma2().unwrap());
        let rt = ProbeRuntime::new(
            registry,
            ExecutionLimits::with_timeout(Duration::from_millis(50)),
        )
        .unwrap();
        let err = rt.run("while true do end", "loop").unwrap_err();
        assert!(err.to_string().contains("timeout"), "{err}");

        // The state stays usable after a timeout.
        rt.run("gma.gettime()", "after").unwrap();
    }
}
