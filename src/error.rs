use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("graph must have at least one node")]
    EmptyGraph,

    #[error("node '{0}' is listed more than once")]
    DuplicateNode(String),

    #[error("edge '{0}' connects a node to itself")]
    SelfLoop(String),

    #[error("maximum {max} nodes allowed per graph, got {count}")]
    TooManyNodes { count: usize, max: usize },

    #[error("minimum {required} edges required for graph with {nodes} nodes")]
    InsufficientEdges { required: usize, nodes: usize },

    #[error("amount of nodes ({nodes}) should be equal to amount of areas ({areas})")]
    AreaCountMismatch { nodes: usize, areas: usize },

    #[error("edge '{0}' should be formatted 'node1-node2'")]
    MalformedEdge(String),

    #[error("edge '{edge}' references unknown node '{node}'")]
    UnknownNode { edge: String, node: String },

    #[error("amount of fixed rooms ({rooms}) should be equal to amount of fixed points ({points})")]
    FixedRoomCountMismatch { rooms: usize, points: usize },

    #[error("amount of fixed rooms ({rooms}) can not be more than graph nodes ({nodes})")]
    TooManyFixedRooms { rooms: usize, nodes: usize },

    #[error("fixed room '{0}' is not a node of the graph")]
    UnknownFixedRoom(String),

    #[error("boundary dimensions must be positive and finite, got {width}x{height}")]
    InvalidBoundary { width: f64, height: f64 },

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("no dissection data available for {rooms} rooms")]
    MissingDissections { rooms: usize },

    #[error("invalid dissection #{index} for {rooms} rooms: {message}")]
    InvalidDissection {
        rooms: usize,
        index: usize,
        message: String,
    },

    #[error("failed to read dissection library {path}: {source}")]
    ReadLibrary {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse dissection library for {rooms} rooms: {source}")]
    ParseLibrary {
        rooms: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("no feasible layout found for requirement graph, try removing some edges")]
    NoFeasibleLayout,

    #[error("no solution found within the time budget")]
    NoSolution,
}

impl Error {
    /// True for failures caused by the caller's input rather than by the
    /// search or the dissection library.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::EmptyGraph
                | Error::DuplicateNode(_)
                | Error::SelfLoop(_)
                | Error::TooManyNodes { .. }
                | Error::InsufficientEdges { .. }
                | Error::AreaCountMismatch { .. }
                | Error::MalformedEdge(_)
                | Error::UnknownNode { .. }
                | Error::FixedRoomCountMismatch { .. }
                | Error::TooManyFixedRooms { .. }
                | Error::UnknownFixedRoom(_)
                | Error::InvalidBoundary { .. }
                | Error::InvalidSettings(_)
        )
    }
}
