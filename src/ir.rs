use serde::{Deserialize, Serialize};
use std::path::Path;

/// Identifier of a node as assigned by the analysis backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub i64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which backend query produced the graph. Every kind shares the same node shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GraphKind {
    #[default]
    #[serde(alias = "function", alias = "cfg")]
    FunctionFlow,
    #[serde(alias = "xrefs")]
    CrossReference,
    #[serde(alias = "callgraph")]
    CallGraph,
    #[serde(alias = "globalCallgraph")]
    GlobalCallGraph,
    #[serde(alias = "dataRefs")]
    DataReference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstructionClass {
    #[serde(alias = "jmp", alias = "ujmp")]
    Jump,
    #[serde(alias = "cjmp")]
    ConditionalJump,
    #[serde(alias = "ucall")]
    Call,
    #[serde(alias = "ret")]
    Return,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    #[serde(rename = "addr", default)]
    pub address: u64,
    #[serde(rename = "disasm", default)]
    pub text: String,
    #[serde(rename = "type", default)]
    pub class: InstructionClass,
    #[serde(default)]
    pub jump: Option<u64>,
    #[serde(default)]
    pub fail: Option<u64>,
}

impl Instruction {
    pub fn new(address: u64, text: impl Into<String>) -> Self {
        Self {
            address,
            text: text.into(),
            class: InstructionClass::Other,
            jump: None,
            fail: None,
        }
    }

    /// Conditional branch with both a taken (`jump`) and fall-through (`fail`) target.
    pub fn branch(address: u64, text: impl Into<String>, jump: u64, fail: u64) -> Self {
        Self {
            address,
            text: text.into(),
            class: InstructionClass::ConditionalJump,
            jump: Some(jump),
            fail: Some(fail),
        }
    }

    pub fn is_two_way_branch(&self) -> bool {
        self.jump.is_some() && self.fail.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(default)]
    pub address: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub instructions: Vec<Instruction>,
    #[serde(rename = "outNodeIds", alias = "successors", default)]
    pub successors: Vec<NodeId>,
}

impl Node {
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id: NodeId(id),
            address: 0,
            title: title.into(),
            body: String::new(),
            instructions: Vec::new(),
            successors: Vec::new(),
        }
    }

    pub fn with_address(mut self, address: u64) -> Self {
        self.address = address;
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_instruction(mut self, instruction: Instruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    pub fn with_successors(mut self, successors: &[i64]) -> Self {
        self.successors
            .extend(successors.iter().copied().map(NodeId));
        self
    }

    pub fn last_instruction(&self) -> Option<&Instruction> {
        self.instructions.last()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub kind: GraphKind,
    #[serde(default)]
    pub nodes: Vec<Node>,
}

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("failed to read graph from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed graph JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl Graph {
    pub fn new(kind: GraphKind) -> Self {
        Self {
            kind,
            nodes: Vec::new(),
        }
    }

    pub fn push(&mut self, node: Node) -> &mut Self {
        self.nodes.push(node);
        self
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|node| node.successors.len()).sum()
    }

    /// Decodes the backend's JSON shape. A bare node array is accepted as a
    /// function flow graph.
    pub fn from_json(input: &str) -> Result<Self, GraphError> {
        let value: serde_json::Value = serde_json::from_str(input)?;
        if value.is_array() {
            let nodes: Vec<Node> = serde_json::from_value(value)?;
            return Ok(Self {
                kind: GraphKind::FunctionFlow,
                nodes,
            });
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, GraphError> {
        let contents = std::fs::read_to_string(path).map_err(|source| GraphError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&contents)
    }
}
