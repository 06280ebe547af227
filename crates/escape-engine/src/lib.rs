pub use self::{core::*, engine::*};

pub mod core;
pub mod engine;

#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("piece colliding with locked cells or walls")]
pub struct PieceCollisionError;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum SpawnError {
    #[display("new piece collides at the spawn position")]
    Collision,
    #[display("arena is already over")]
    GameOver,
}
