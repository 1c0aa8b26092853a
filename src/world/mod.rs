mod builder;
mod camera;
mod geometry;
mod model;
mod object;
mod sprite;
mod texture;
mod voxel;

pub use builder::{LevelBuilder, LevelError, SectorSpec, signed_area};

pub use geometry::{
    Adjoin, Level, MAX_LIGHT, Sector, SectorFlags, SectorId, Sky, Vertex, VertexId, Wall,
    WallFlags, WallId, WallTexture,
};

pub use camera::Camera;

pub use model::{JediModel, ModelId, Polygon, Shading};
pub use object::{ObjectFlags, ObjectId, ObjectPayload, SecObject};
pub use sprite::{Sprite, SpriteData, SpriteError, SpriteId, decode_rle, encode_rle};
pub use voxel::{VoxelColumn, VoxelId, VoxelModel, VoxelRun};

pub use texture::{
    Colormap, LIGHT_LEVELS, NO_TEXTURE, Palette, Texture, TextureBank, TextureError, TextureId,
    wrap,
};
