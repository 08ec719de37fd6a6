// Domain layer - Pure environmental types and algorithms
pub mod analysis;
pub mod explanation;
pub mod insight;
pub mod risk;
pub mod series;
pub mod statistics;
