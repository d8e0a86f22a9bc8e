pub mod aggregation;
pub mod films;
pub mod like_graph;
pub mod popularity;
pub mod recommendations;
pub mod search;

pub use films::FilmService;
pub use like_graph::LikeGraph;
