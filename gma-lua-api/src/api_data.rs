// GrandMA2 Lua API surface.
//
// Host names are used throughout: the XML helpers are exposed by the console
// as `gma.import` and `gma.export`.

use crate::lua_api_schema::*;
use crate::operators::InfixOperator;

/// The GrandMA2 console API plus the `Lua` operator markers.
pub const GMA2_LUA_API: LuaApiSchema = LuaApiSchema {
    namespaces: &[
        GMA_NAMESPACE,
        GMA_CANBUS_NAMESPACE,
        GMA_GUI_NAMESPACE,
        GMA_GUI_PROGRESS_NAMESPACE,
        GMA_USER_NAMESPACE,
        GMA_SHOW_NAMESPACE,
        GMA_SHOW_GETOBJ_NAMESPACE,
        GMA_SHOW_PROPERTY_NAMESPACE,
        GMA_NETWORK_NAMESPACE,
        LUA_OPERATORS_NAMESPACE,
    ],
    aliases: &[HANDLE_ALIAS, ERROR_ALIAS, SUCCESS_ALIAS],
};

// ============================================================================
// Type Aliases
// ============================================================================

const HANDLE_ALIAS: AliasSchema = AliasSchema {
    name: "handle",
    ty: "number",
    description: "Opaque reference to a console object",
    kind: AliasKind::OpaqueHandle,
};

const ERROR_ALIAS: AliasSchema = AliasSchema {
    name: "error",
    ty: "string",
    description: "Command result: empty on success, otherwise the failure message",
    kind: AliasKind::ErrorMessage,
};

const SUCCESS_ALIAS: AliasSchema = AliasSchema {
    name: "success",
    ty: "boolean",
    description: "true if the console accepted the request",
    kind: AliasKind::SuccessFlag,
};

// ============================================================================
// gma (root namespace)
// ============================================================================

const GMA_NAMESPACE: NamespaceSchema = NamespaceSchema {
    path: "gma",
    description: "GrandMA2 Lua API",
    functions: &[
        FunctionSchema::new(
            "sleep",
            "Sleep for n seconds",
            &[ParamSchema::required("seconds", "number")],
            None,
        ),
        FunctionSchema::new(
            "echo",
            "Print to System Monitor console",
            &[ParamSchema::variadic("any")],
            None,
        ),
        FunctionSchema::new(
            "feedback",
            "Print to Command Line feedback",
            &[ParamSchema::variadic("any")],
            None,
        ),
        FunctionSchema::new(
            "cmd",
            "Execute GrandMA2 CLI command",
            &[ParamSchema::required("command", "string")],
            ReturnSchema::of("error"),
        ),
        FunctionSchema::new(
            "build_date",
            "Get build date, e.g. \"Jan 01 2021\"",
            &[],
            ReturnSchema::of("string"),
        ),
        FunctionSchema::new(
            "build_time",
            "Get build time, e.g. \"22:22:22\"",
            &[],
            ReturnSchema::of("string"),
        ),
        FunctionSchema::new(
            "git_version",
            "Git version hash",
            &[],
            ReturnSchema::of("string"),
        ),
        FunctionSchema::new(
            "gethardwaretype",
            "Get hardware type: \"GMA2\" or \"GMA3\"",
            &[],
            ReturnSchema::of("string"),
        ),
        FunctionSchema::new(
            "import",
            "Import XML file to Lua table",
            &[
                ParamSchema::required("filename", "string"),
                ParamSchema::optional("subfolder", "string"),
            ],
            ReturnSchema::of("table"),
        ),
        FunctionSchema::new(
            "export",
            "Export Lua table to XML file",
            &[
                ParamSchema::required("filename", "string"),
                ParamSchema::required("data", "table"),
            ],
            None,
        ),
        FunctionSchema::new(
            "export_csv",
            "Export Lua table to CSV file",
            &[
                ParamSchema::required("filename", "string"),
                ParamSchema::required("data", "table"),
            ],
            None,
        ),
        FunctionSchema::new(
            "export_json",
            "Export Lua table to JSON file",
            &[
                ParamSchema::required("filename", "string"),
                ParamSchema::required("data", "table"),
            ],
            None,
        ),
        FunctionSchema::new(
            "timer",
            "Set timer function",
            &[
                ParamSchema::required("callback", "function"),
                ParamSchema::required("timeout", "number"),
                ParamSchema::required("max_count", "number"),
                ParamSchema::optional("cleanup", "function"),
            ],
            None,
        ),
        FunctionSchema::new(
            "gettime",
            "Get unix timestamp",
            &[],
            ReturnSchema::of("number"),
        ),
        FunctionSchema::new(
            "textinput",
            "Show input dialog",
            &[
                ParamSchema::required("title", "string"),
                ParamSchema::optional("placeholder", "string"),
            ],
            ReturnSchema::of("string"),
        ),
    ],
};

// ============================================================================
// gma.canbus
// ============================================================================

const GMA_CANBUS_NAMESPACE: NamespaceSchema = NamespaceSchema {
    path: "gma.canbus",
    description: "Front panel interaction",
    functions: &[
        FunctionSchema::new(
            "hardkey",
            "Press or release a front panel key",
            &[
                ParamSchema::required("keycode", "number"),
                ParamSchema::required("pressed", "boolean"),
                ParamSchema::required("hold", "boolean"),
            ],
            ReturnSchema::of("success"),
        ),
        FunctionSchema::new(
            "encoder",
            "Turn a front panel encoder",
            &[
                ParamSchema::required("encoder", "number"),
                ParamSchema::required("steps", "number"),
                ParamSchema::required("pressed", "boolean"),
            ],
            ReturnSchema::of("success"),
        ),
        FunctionSchema::new(
            "wheel",
            "Turn the level wheel",
            &[ParamSchema::required("steps", "number")],
            ReturnSchema::of("success"),
        ),
        FunctionSchema::new(
            "ball",
            "Move the trackball",
            &[
                ParamSchema::required("x_axis", "number"),
                ParamSchema::required("y_axis", "number"),
            ],
            ReturnSchema::of("success"),
        ),
    ],
};

// ============================================================================
// gma.gui
// ============================================================================

const GMA_GUI_NAMESPACE: NamespaceSchema = NamespaceSchema {
    path: "gma.gui",
    description: "Dialogs",
    functions: &[
        FunctionSchema::new(
            "confirm",
            "Show confirm dialog",
            &[
                ParamSchema::required("title", "string"),
                ParamSchema::required("message", "string"),
            ],
            ReturnSchema::of("boolean"),
        ),
        FunctionSchema::new(
            "msgbox",
            "Show messagebox dialog",
            &[
                ParamSchema::required("title", "string"),
                ParamSchema::required("message", "string"),
            ],
            ReturnSchema::of("boolean"),
        ),
    ],
};

const GMA_GUI_PROGRESS_NAMESPACE: NamespaceSchema = NamespaceSchema {
    path: "gma.gui.progress",
    description: "Progress bars",
    functions: &[
        FunctionSchema::new(
            "start",
            "Show a progress bar. It must be stopped by the script.",
            &[ParamSchema::required("name", "string")],
            ReturnSchema::of("handle"),
        ),
        FunctionSchema::new(
            "stop",
            "Stop a progress bar",
            &[ParamSchema::required("handle", "handle")],
            None,
        ),
        FunctionSchema::new(
            "settext",
            "Set progress bar text",
            &[
                ParamSchema::required("handle", "handle"),
                ParamSchema::required("text", "string"),
            ],
            None,
        ),
        FunctionSchema::new(
            "setrange",
            "Set progress bar range",
            &[
                ParamSchema::required("handle", "handle"),
                ParamSchema::required("from", "number"),
                ParamSchema::required("to", "number"),
            ],
            None,
        ),
        FunctionSchema::new(
            "set",
            "Set progress bar value",
            &[
                ParamSchema::required("handle", "handle"),
                ParamSchema::required("value", "number"),
            ],
            None,
        ),
    ],
};

// ============================================================================
// gma.user
// ============================================================================

const GMA_USER_NAMESPACE: NamespaceSchema = NamespaceSchema {
    path: "gma.user",
    description: "Per-user state",
    functions: &[
        FunctionSchema::new(
            "getcmddest",
            "Get the current command destination",
            &[],
            ReturnSchema::of("handle"),
        ),
        FunctionSchema::new(
            "getselectedexec",
            "Get the selected executor",
            &[],
            ReturnSchema::of("handle"),
        ),
        FunctionSchema::new(
            "getvar",
            "Get a user variable",
            &[ParamSchema::required("uservar_name", "string")],
            ReturnSchema::of("string"),
        ),
        FunctionSchema::new(
            "setvar",
            "Set a user variable",
            &[
                ParamSchema::required("uservar_name", "string"),
                ParamSchema::required("value", "string"),
            ],
            None,
        ),
    ],
};

// ============================================================================
// gma.show
// ============================================================================

const GMA_SHOW_NAMESPACE: NamespaceSchema = NamespaceSchema {
    path: "gma.show",
    description: "Show data",
    functions: &[
        FunctionSchema::new(
            "getdmx",
            "Get the value of a DMX address",
            &[ParamSchema::required("dmx_addr", "number")],
            ReturnSchema::of("number"),
        ),
        FunctionSchema::new(
            "getdmx",
            "Read a range of DMX values into a reusable table",
            &[
                ParamSchema::required("recycle", "table"),
                ParamSchema::required("dmx_addr", "number"),
                ParamSchema::required("amount", "number"),
            ],
            ReturnSchema::of("table"),
        ),
        FunctionSchema::new(
            "getvar",
            "Get a show variable",
            &[ParamSchema::required("var_name", "string")],
            ReturnSchema::of("string"),
        ),
        FunctionSchema::new(
            "setvar",
            "Set a show variable",
            &[
                ParamSchema::required("var_name", "string"),
                ParamSchema::required("value", "string"),
            ],
            None,
        ),
    ],
};

const GMA_SHOW_GETOBJ_NAMESPACE: NamespaceSchema = NamespaceSchema {
    path: "gma.show.getobj",
    description: "Show object queries",
    functions: &[
        FunctionSchema::new(
            "handle",
            "Get object handle from name, e.g. 'Fixture 123.1'",
            &[ParamSchema::required("name", "string")],
            ReturnSchema::of("handle"),
        ),
        FunctionSchema::new(
            "handle",
            "Get object handle from another handle",
            &[ParamSchema::required("handle", "handle")],
            ReturnSchema::of("handle"),
        ),
        FunctionSchema::new(
            "class",
            "Get object class name",
            &[ParamSchema::required("handle", "handle")],
            ReturnSchema::of("string"),
        ),
        FunctionSchema::new(
            "index",
            "Get object index",
            &[ParamSchema::required("handle", "handle")],
            ReturnSchema::of("number"),
        ),
        FunctionSchema::new(
            "number",
            "Get object CLI number (id)",
            &[ParamSchema::required("handle", "handle")],
            ReturnSchema::of("number"),
        ),
        FunctionSchema::new(
            "name",
            "Get object name",
            &[ParamSchema::required("handle", "handle")],
            ReturnSchema::of("string"),
        ),
        FunctionSchema::new(
            "label",
            "Get object label, nil if the object has no label set",
            &[ParamSchema::required("handle", "handle")],
            ReturnSchema::of("string?"),
        ),
        FunctionSchema::new(
            "amount",
            "Get number of child objects",
            &[ParamSchema::required("handle", "handle")],
            ReturnSchema::of("number"),
        ),
        FunctionSchema::new(
            "child",
            "Get child of object by index",
            &[
                ParamSchema::required("handle", "handle"),
                ParamSchema::required("index", "number"),
            ],
            ReturnSchema::of("handle"),
        ),
        FunctionSchema::new(
            "parent",
            "Get parent of object",
            &[ParamSchema::required("handle", "handle")],
            ReturnSchema::of("handle"),
        ),
        FunctionSchema::new(
            "verify",
            "Verify object exists",
            &[ParamSchema::required("handle", "handle")],
            ReturnSchema::of("boolean"),
        ),
        FunctionSchema::new(
            "compare",
            "Compare two objects by handle",
            &[
                ParamSchema::required("handle1", "handle"),
                ParamSchema::required("handle2", "handle"),
            ],
            ReturnSchema::of("boolean"),
        ),
    ],
};

const GMA_SHOW_PROPERTY_NAMESPACE: NamespaceSchema = NamespaceSchema {
    path: "gma.show.property",
    description: "Show object properties",
    functions: &[
        FunctionSchema::new(
            "amount",
            "Get number of object properties",
            &[ParamSchema::required("handle", "handle")],
            ReturnSchema::of("number"),
        ),
        FunctionSchema::new(
            "name",
            "Get property name by index",
            &[
                ParamSchema::required("handle", "handle"),
                ParamSchema::required("index", "number"),
            ],
            ReturnSchema::of("string"),
        ),
        FunctionSchema::new(
            "get",
            "Get property value by index",
            &[
                ParamSchema::required("handle", "handle"),
                ParamSchema::required("index", "number"),
            ],
            ReturnSchema::of("string"),
        ),
        FunctionSchema::new(
            "get",
            "Get property value by name",
            &[
                ParamSchema::required("handle", "handle"),
                ParamSchema::required("name", "string"),
            ],
            ReturnSchema::of("string"),
        ),
        FunctionSchema::new(
            "set",
            "Set property value by index",
            &[
                ParamSchema::required("handle", "handle"),
                ParamSchema::required("index", "number"),
                ParamSchema::required("value", "string"),
            ],
            ReturnSchema::of("success"),
        ),
        FunctionSchema::new(
            "set",
            "Set property value by name",
            &[
                ParamSchema::required("handle", "handle"),
                ParamSchema::required("name", "string"),
                ParamSchema::required("value", "string"),
            ],
            ReturnSchema::of("success"),
        ),
    ],
};

// ============================================================================
// gma.network
// ============================================================================

const GMA_NETWORK_NAMESPACE: NamespaceSchema = NamespaceSchema {
    path: "gma.network",
    description: "Network and session queries",
    functions: &[
        FunctionSchema::new(
            "gethosttype",
            "Get host type, e.g. \"Console\"",
            &[],
            ReturnSchema::of("string"),
        ),
        FunctionSchema::new(
            "gethostsubtype",
            "Get host subtype, e.g. \"onPC\"",
            &[],
            ReturnSchema::of("string"),
        ),
        FunctionSchema::new(
            "getprimaryip",
            "Get primary IP address",
            &[],
            ReturnSchema::of("string"),
        ),
        FunctionSchema::new(
            "getsecondaryip",
            "Get secondary IP address",
            &[],
            ReturnSchema::of("string"),
        ),
        FunctionSchema::new(
            "getstatus",
            "Get session status, e.g. \"Master\" or \"Standalone\"",
            &[],
            ReturnSchema::of("string"),
        ),
        FunctionSchema::new(
            "getsessionnumber",
            "Get session number",
            &[],
            ReturnSchema::of("number"),
        ),
        FunctionSchema::new(
            "getsessionname",
            "Get session name",
            &[],
            ReturnSchema::of("string"),
        ),
        FunctionSchema::new(
            "getslot",
            "Get session slot number",
            &[],
            ReturnSchema::of("number"),
        ),
        FunctionSchema::new(
            "gethostdata",
            "Get diagnostic host data",
            &[
                ParamSchema::required("ip", "string"),
                ParamSchema::optional("recycle", "table"),
            ],
            ReturnSchema::of("table"),
        ),
        FunctionSchema::new(
            "getmanetslot",
            "Get diagnostic MA-Net slot data",
            &[
                ParamSchema::required("slot", "number"),
                ParamSchema::optional("recycle", "table"),
            ],
            ReturnSchema::of("table"),
        ),
        FunctionSchema::new(
            "getperformance",
            "Get diagnostic performance data",
            &[
                ParamSchema::required("slot", "number"),
                ParamSchema::optional("recycle", "table"),
            ],
            ReturnSchema::of("table"),
        ),
    ],
};

// ============================================================================
// Lua (operator-translation markers)
// ============================================================================

const LUA_OPERATORS_NAMESPACE: NamespaceSchema = NamespaceSchema {
    path: "Lua",
    description: "Operators missing from the host Lua dialect. Calls are rewritten before execution.",
    functions: &[
        FunctionSchema::new(
            "Modulo",
            "Calls to this function are translated to left % right",
            &[
                ParamSchema::required("left", "number"),
                ParamSchema::required("right", "number"),
            ],
            ReturnSchema::of("number"),
        )
        .translated_to(InfixOperator::Modulo),
        FunctionSchema::new(
            "FloorDiv",
            "Calls to this function are translated to left // right",
            &[
                ParamSchema::required("left", "number"),
                ParamSchema::required("right", "number"),
            ],
            ReturnSchema::of("number"),
        )
        .translated_to(InfixOperator::FloorDivision),
    ],
};
