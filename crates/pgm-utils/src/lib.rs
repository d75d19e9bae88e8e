mod arena;
mod multi_array;
mod multi_array_error;
mod shape;

pub use arena::{Arena, ArenaKey};
pub use multi_array::MultiArray;
pub use multi_array_error::MultiArrayError;
pub use shape::{Shape, Strides, flat_index_of, try_flat_index_of};
