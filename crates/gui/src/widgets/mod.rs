//! Interactive helpers living inside the scene.

pub mod picked_point;
pub mod surface_point;

pub use picked_point::{find_coords, to_picked_point, PickedPoint, PointOnObject};
pub use surface_point::{Parameters, PositionType, RadiusSizeType, SurfacePointWidget};
