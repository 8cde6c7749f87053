//! Data models for Mystic Tarot Index

mod card;
mod document;
mod identity;
mod spread;

pub use card::{Aspect, CardCategory, CardId, Interpretation, TarotCard};
pub use document::{DocumentPatch, FavoriteSet, NoteMap, UserDocument};
pub use identity::Identity;
pub use spread::{SpreadCard, SpreadId, SpreadRecord};
pub(crate) use spread::sort_by_updated_desc;
