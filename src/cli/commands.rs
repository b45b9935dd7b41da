//! Subcommands and their mapping to editor methods.

use std::fs;
use std::path::PathBuf;

use clap::Subcommand;
use serde_json::{Map, Value, json};

use crate::error::{BridgeError, BridgeResult};

/// One remote call ready to be issued.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcCall {
    pub method: String,
    pub params: Value,
}

impl RpcCall {
    fn new(method: &str, params: Value) -> Self {
        Self {
            method: method.to_string(),
            params,
        }
    }

    fn bare(method: &str) -> Self {
        Self::new(method, json!({}))
    }
}

/// What the binary does for a parsed command line.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Report connection status; never fails because the editor is down
    Status,
    Call(RpcCall),
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Project information and settings
    #[command(subcommand)]
    Project(ProjectCommand),
    /// Editor state and operations
    #[command(subcommand)]
    Editor(EditorCommand),
    /// Scene management
    #[command(subcommand)]
    Scene(SceneCommand),
    /// Node manipulation
    #[command(subcommand)]
    Node(NodeCommand),
    /// Script management
    #[command(subcommand)]
    Script(ScriptCommand),
    /// Run and stop the game
    #[command(subcommand)]
    Play(PlayCommand),
    /// Resources (materials, meshes, lights, collision shapes)
    #[command(subcommand)]
    Resource(ResourceCommand),
    /// Filesystem operations inside the project
    #[command(subcommand)]
    File(FileCommand),
    /// Introspection and discovery
    #[command(subcommand)]
    Introspect(IntrospectCommand),
    /// Execute a raw RPC method
    Rpc {
        /// Method name, e.g. scene.get_tree
        method: String,
        /// Params as a JSON object
        params: Option<String>,
    },
    /// Check the connection to the editor
    Status,
}

#[derive(Debug, Subcommand)]
pub enum ProjectCommand {
    /// Get project information
    Info,
    /// List autoload singletons
    Autoloads,
    /// Get input action mappings
    InputMap,
    /// Add an input action with a key binding
    AddInput { action: String, key: String },
}

#[derive(Debug, Subcommand)]
pub enum EditorCommand {
    /// Get the current editor state
    State,
    /// Get editor logs
    Logs,
    /// Clear editor logs
    ClearLogs,
    /// Save all open scenes
    SaveAll,
}

#[derive(Debug, Subcommand)]
pub enum SceneCommand {
    /// Open a scene file
    Open { path: String },
    /// Save the current scene
    Save {
        #[arg(long)]
        path: Option<String>,
    },
    /// Create a new scene
    Create {
        root_type: String,
        path: String,
        /// Name of the root node
        #[arg(long)]
        name: Option<String>,
    },
    /// Get the scene tree hierarchy
    Tree,
    /// Instance a scene as a child of a node
    Instance {
        parent: String,
        scene_path: String,
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum NodeCommand {
    /// List child nodes
    List {
        #[arg(long)]
        parent: Option<String>,
    },
    /// Get node details
    Get { path: String },
    /// Get node properties
    Props { path: String },
    /// Set node properties from a JSON object
    Set { path: String, props: String },
    /// Add a new node
    Add {
        parent: String,
        #[arg(value_name = "TYPE")]
        node_type: String,
        name: String,
        /// Initial properties as a JSON object
        #[arg(long)]
        props: Option<String>,
    },
    /// Remove a node
    Remove { path: String },
    /// Rename a node
    Rename { path: String, new_name: String },
    /// Duplicate a node
    Duplicate { path: String },
    /// Move a node under a new parent
    Reparent { path: String, new_parent: String },
}

#[derive(Debug, Subcommand)]
pub enum ScriptCommand {
    /// Read script content
    Read { path: String },
    /// Write script content
    Write {
        path: String,
        content: Option<String>,
        /// Read content from a local file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Assign a script to a node
    Assign { node: String, script: String },
}

#[derive(Debug, Subcommand)]
pub enum PlayCommand {
    /// Run the main scene
    Run,
    /// Run the current scene
    Current,
    /// Stop the running game
    Stop,
    /// Get the play state
    State,
}

#[derive(Debug, Subcommand)]
pub enum ResourceCommand {
    /// Create a material and apply it to a node
    Material {
        node: String,
        #[arg(long, default_value = "StandardMaterial3D")]
        material_type: String,
        #[arg(long)]
        props: Option<String>,
    },
    /// Create a mesh on a MeshInstance3D
    Mesh {
        node: String,
        mesh_type: String,
        /// Mesh parameters as a JSON object
        #[arg(long)]
        params: Option<String>,
    },
    /// Create a light node
    Light {
        parent: String,
        light_type: String,
        name: String,
        #[arg(long)]
        props: Option<String>,
    },
    /// Create a collision shape
    Collision {
        node: String,
        shape_type: String,
        /// Shape parameters as a JSON object
        #[arg(long)]
        params: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum FileCommand {
    /// Search files in the project
    Search {
        pattern: String,
        #[arg(long, default_value = "res://")]
        path: String,
    },
    /// Read file content
    Read { path: String },
    /// Write file content
    Write { path: String, content: String },
    /// Create a folder
    Mkdir { path: String },
    /// Delete a file or folder
    Delete { path: String },
    /// Rescan the project filesystem
    Refresh,
}

#[derive(Debug, Subcommand)]
pub enum IntrospectCommand {
    /// Get the properties of a class
    Class { class_name: String },
    /// Get the class catalog
    Catalog {
        #[arg(long)]
        category: Option<String>,
    },
}

impl Command {
    /// Resolve the command into an action.
    ///
    /// JSON arguments are validated here, before any connection is made.
    pub fn action(&self) -> BridgeResult<Action> {
        let call = match self {
            Command::Status => return Ok(Action::Status),
            Command::Rpc { method, params } => {
                let params = match params {
                    Some(raw) => parse_json_arg("params", raw)?,
                    None => json!({}),
                };
                RpcCall::new(method, params)
            }
            Command::Project(command) => command.to_call(),
            Command::Editor(command) => command.to_call(),
            Command::Scene(command) => command.to_call(),
            Command::Node(command) => command.to_call()?,
            Command::Script(command) => command.to_call()?,
            Command::Play(command) => command.to_call(),
            Command::Resource(command) => command.to_call()?,
            Command::File(command) => command.to_call(),
            Command::Introspect(command) => command.to_call(),
        };
        Ok(Action::Call(call))
    }
}

impl ProjectCommand {
    fn to_call(&self) -> RpcCall {
        match self {
            ProjectCommand::Info => RpcCall::bare("project.get_info"),
            ProjectCommand::Autoloads => RpcCall::bare("project.get_autoloads"),
            ProjectCommand::InputMap => RpcCall::bare("project.get_input_map"),
            ProjectCommand::AddInput { action, key } => RpcCall::new(
                "project.add_input_action",
                json!({"action": action, "key": key}),
            ),
        }
    }
}

impl EditorCommand {
    fn to_call(&self) -> RpcCall {
        match self {
            EditorCommand::State => RpcCall::bare("editor.get_state"),
            EditorCommand::Logs => RpcCall::bare("editor.get_logs"),
            EditorCommand::ClearLogs => RpcCall::bare("editor.clear_logs"),
            EditorCommand::SaveAll => RpcCall::bare("editor.save_all"),
        }
    }
}

impl SceneCommand {
    fn to_call(&self) -> RpcCall {
        match self {
            SceneCommand::Open { path } => {
                RpcCall::new("editor.open_scene", json!({"scene_path": path}))
            }
            SceneCommand::Save { path } => {
                let mut params = Map::new();
                insert_opt(&mut params, "scene_path", path);
                RpcCall::new("editor.save_scene", Value::Object(params))
            }
            SceneCommand::Create {
                root_type,
                path,
                name,
            } => {
                let mut params = object(json!({"root_type": root_type, "scene_path": path}));
                insert_opt(&mut params, "root_name", name);
                RpcCall::new("scene.create_scene", Value::Object(params))
            }
            SceneCommand::Tree => RpcCall::bare("scene.get_tree"),
            SceneCommand::Instance {
                parent,
                scene_path,
                name,
            } => {
                let mut params =
                    object(json!({"parent_path": parent, "scene_path": scene_path}));
                insert_opt(&mut params, "name", name);
                RpcCall::new("scene.instance_scene", Value::Object(params))
            }
        }
    }
}

impl NodeCommand {
    fn to_call(&self) -> BridgeResult<RpcCall> {
        let call = match self {
            NodeCommand::List { parent } => {
                let mut params = Map::new();
                insert_opt(&mut params, "parent_path", parent);
                RpcCall::new("scene.list_nodes", Value::Object(params))
            }
            NodeCommand::Get { path } => {
                RpcCall::new("scene.get_node", json!({"node_path": path}))
            }
            NodeCommand::Props { path } => {
                RpcCall::new("scene.get_node_properties", json!({"node_path": path}))
            }
            NodeCommand::Set { path, props } => RpcCall::new(
                "scene.set_node_properties",
                json!({"node_path": path, "properties": parse_json_arg("props", props)?}),
            ),
            NodeCommand::Add {
                parent,
                node_type,
                name,
                props,
            } => {
                let mut params =
                    object(json!({"parent_path": parent, "type": node_type, "name": name}));
                insert_json_opt(&mut params, "properties", "props", props)?;
                RpcCall::new("scene.add_node", Value::Object(params))
            }
            NodeCommand::Remove { path } => {
                RpcCall::new("scene.remove_node", json!({"node_path": path}))
            }
            NodeCommand::Rename { path, new_name } => RpcCall::new(
                "scene.rename_node",
                json!({"node_path": path, "new_name": new_name}),
            ),
            NodeCommand::Duplicate { path } => {
                RpcCall::new("scene.duplicate_node", json!({"node_path": path}))
            }
            NodeCommand::Reparent { path, new_parent } => RpcCall::new(
                "scene.reparent_node",
                json!({"node_path": path, "new_parent_path": new_parent}),
            ),
        };
        Ok(call)
    }
}

impl ScriptCommand {
    fn to_call(&self) -> BridgeResult<RpcCall> {
        let call = match self {
            ScriptCommand::Read { path } => {
                RpcCall::new("filesystem.read_text", json!({"path": path}))
            }
            ScriptCommand::Write {
                path,
                content,
                file,
            } => {
                let content = match (file, content) {
                    (Some(file), _) => fs::read_to_string(file).map_err(|e| {
                        BridgeError::usage(format!("cannot read {}: {}", file.display(), e))
                    })?,
                    (None, Some(content)) => content.clone(),
                    (None, None) => return Err(BridgeError::usage("Provide content or --file")),
                };
                if content.is_empty() {
                    return Err(BridgeError::usage("Provide content or --file"));
                }
                RpcCall::new(
                    "filesystem.write_text",
                    json!({"path": path, "content": content}),
                )
            }
            ScriptCommand::Assign { node, script } => RpcCall::new(
                "scene.assign_script",
                json!({"node_path": node, "script_path": script}),
            ),
        };
        Ok(call)
    }
}

impl PlayCommand {
    fn to_call(&self) -> RpcCall {
        match self {
            PlayCommand::Run => RpcCall::bare("play.run_main"),
            PlayCommand::Current => RpcCall::bare("play.run_current"),
            PlayCommand::Stop => RpcCall::bare("play.stop"),
            PlayCommand::State => RpcCall::bare("play.get_state"),
        }
    }
}

impl ResourceCommand {
    fn to_call(&self) -> BridgeResult<RpcCall> {
        let call = match self {
            ResourceCommand::Material {
                node,
                material_type,
                props,
            } => {
                let mut params =
                    object(json!({"node_path": node, "material_type": material_type}));
                insert_json_opt(&mut params, "properties", "props", props)?;
                RpcCall::new("resources.create_material", Value::Object(params))
            }
            ResourceCommand::Mesh {
                node,
                mesh_type,
                params: mesh_params,
            } => {
                let mut params = object(json!({"node_path": node, "mesh_type": mesh_type}));
                insert_json_opt(&mut params, "mesh_params", "params", mesh_params)?;
                RpcCall::new("scene.create_mesh", Value::Object(params))
            }
            ResourceCommand::Light {
                parent,
                light_type,
                name,
                props,
            } => {
                let mut params = object(
                    json!({"parent_path": parent, "light_type": light_type, "name": name}),
                );
                insert_json_opt(&mut params, "properties", "props", props)?;
                RpcCall::new("resources.create_light", Value::Object(params))
            }
            ResourceCommand::Collision {
                node,
                shape_type,
                params: shape_params,
            } => {
                let mut params = object(json!({"node_path": node, "shape_type": shape_type}));
                insert_json_opt(&mut params, "shape_params", "params", shape_params)?;
                RpcCall::new("resources.create_collision_shape", Value::Object(params))
            }
        };
        Ok(call)
    }
}

impl FileCommand {
    fn to_call(&self) -> RpcCall {
        match self {
            FileCommand::Search { pattern, path } => RpcCall::new(
                "filesystem.search",
                json!({"pattern": pattern, "path": path}),
            ),
            FileCommand::Read { path } => {
                RpcCall::new("filesystem.read_text", json!({"path": path}))
            }
            FileCommand::Write { path, content } => RpcCall::new(
                "filesystem.write_text",
                json!({"path": path, "content": content}),
            ),
            FileCommand::Mkdir { path } => {
                RpcCall::new("filesystem.create_folder", json!({"path": path}))
            }
            FileCommand::Delete { path } => {
                RpcCall::new("filesystem.delete", json!({"path": path}))
            }
            FileCommand::Refresh => RpcCall::bare("filesystem.refresh"),
        }
    }
}

impl IntrospectCommand {
    fn to_call(&self) -> RpcCall {
        match self {
            IntrospectCommand::Class { class_name } => RpcCall::new(
                "introspect.class_properties",
                json!({"class_name": class_name}),
            ),
            IntrospectCommand::Catalog { category } => {
                let mut params = Map::new();
                insert_opt(&mut params, "category", category);
                RpcCall::new("introspect.catalog", Value::Object(params))
            }
        }
    }
}

/// Parse a JSON command-line argument.
pub fn parse_json_arg(name: &str, raw: &str) -> BridgeResult<Value> {
    serde_json::from_str(raw)
        .map_err(|e| BridgeError::usage(format!("Invalid JSON for {}: {}", name, e)))
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn insert_opt(params: &mut Map<String, Value>, key: &str, value: &Option<String>) {
    if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
        params.insert(key.to_string(), Value::String(value.to_string()));
    }
}

fn insert_json_opt(
    params: &mut Map<String, Value>,
    key: &str,
    arg_name: &str,
    raw: &Option<String>,
) -> BridgeResult<()> {
    if let Some(raw) = raw.as_deref().filter(|v| !v.is_empty()) {
        params.insert(key.to_string(), parse_json_arg(arg_name, raw)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn action(args: &[&str]) -> BridgeResult<Action> {
        let mut argv = vec!["godot-bridge"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().command.action()
    }

    fn call(args: &[&str]) -> RpcCall {
        match action(args).unwrap() {
            Action::Call(call) => call,
            Action::Status => panic!("expected a call"),
        }
    }

    #[test]
    fn bare_commands_send_empty_params() {
        assert_eq!(call(&["play", "run"]), RpcCall::bare("play.run_main"));
        assert_eq!(call(&["editor", "clear-logs"]), RpcCall::bare("editor.clear_logs"));
        assert_eq!(call(&["project", "input-map"]), RpcCall::bare("project.get_input_map"));
    }

    #[test]
    fn scene_create_includes_root_name_only_when_given() {
        let without = call(&["scene", "create", "Node3D", "res://main.tscn"]);
        assert_eq!(without.method, "scene.create_scene");
        assert_eq!(
            without.params,
            json!({"root_type": "Node3D", "scene_path": "res://main.tscn"})
        );

        let with = call(&["scene", "create", "Node3D", "res://main.tscn", "--name", "Main"]);
        assert_eq!(with.params["root_name"], "Main");
    }

    #[test]
    fn node_set_parses_properties() {
        let call = call(&["node", "set", "/root/Main/Player", r#"{"visible": false}"#]);
        assert_eq!(call.method, "scene.set_node_properties");
        assert_eq!(
            call.params,
            json!({"node_path": "/root/Main/Player", "properties": {"visible": false}})
        );
    }

    #[test]
    fn invalid_json_argument_is_a_usage_error() {
        let err = action(&["node", "set", "/root/Main", "{not json"]).unwrap_err();
        assert!(matches!(err, BridgeError::Usage { .. }), "{:?}", err);
        assert_eq!(err.exit_code(), 2);

        let err = action(&["rpc", "scene.get_tree", "[oops"]).unwrap_err();
        assert!(matches!(err, BridgeError::Usage { .. }));
    }

    #[test]
    fn node_add_maps_type_and_optional_props() {
        let call = call(&[
            "node", "add", "/root/Main", "Sprite2D", "Icon", "--props", r#"{"z_index": 2}"#,
        ]);
        assert_eq!(call.method, "scene.add_node");
        assert_eq!(
            call.params,
            json!({"parent_path": "/root/Main", "type": "Sprite2D", "name": "Icon", "properties": {"z_index": 2}})
        );
    }

    #[test]
    fn resource_material_defaults_to_standard_material() {
        let call = call(&["resource", "material", "/root/Main/Mesh"]);
        assert_eq!(call.method, "resources.create_material");
        assert_eq!(call.params["material_type"], "StandardMaterial3D");
    }

    #[test]
    fn file_search_defaults_to_project_root() {
        let call = call(&["file", "search", "*.gd"]);
        assert_eq!(call.params, json!({"pattern": "*.gd", "path": "res://"}));
    }

    #[test]
    fn script_write_reads_content_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("player.gd");
        fs::write(&path, "extends Node\n").unwrap();

        let call = call(&["script", "write", "res://player.gd", "--file", path.to_str().unwrap()]);
        assert_eq!(call.method, "filesystem.write_text");
        assert_eq!(call.params["content"], "extends Node\n");
    }

    #[test]
    fn script_write_without_content_is_a_usage_error() {
        let err = action(&["script", "write", "res://player.gd"]).unwrap_err();
        assert_eq!(err, BridgeError::usage("Provide content or --file"));
    }

    #[test]
    fn raw_rpc_passes_method_and_params_through() {
        let rpc = call(&["rpc", "custom.method", r#"{"a": [1, 2]}"#]);
        assert_eq!(rpc, RpcCall::new("custom.method", json!({"a": [1, 2]})));
        assert_eq!(call(&["rpc", "editor.get_state"]).params, json!({}));
    }

    #[test]
    fn status_is_not_a_call() {
        assert_eq!(action(&["status"]).unwrap(), Action::Status);
    }
}
