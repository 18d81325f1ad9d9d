//! # Widget Components
//!
//! Every part of the widget is a [`Comp`](crate::ui::component::Comp) with its
//! own variant state, except the avatar, which is a render/update pair
//! embedded by its parents. Each file holds the props type, the render/update pair,
//! any DOM actions and listeners, the public API and the tests.
//!
//! ```text
//! components/
//! ├── mod.rs            (this file)
//! ├── chat_root.rs      (theme + sizing chrome)
//! ├── chat_segment.rs   (one user/AI exchange)
//! ├── chat_item.rs      (one message, streaming → committed)
//! ├── avatar.rs         (persona picture / letter, embedded)
//! ├── launchpad.rs      (persona welcome + conversation starters)
//! └── composer.rs       (draft text + submit control)
//! ```
//!
//! Containers never reach into a child's DOM. They compose cloned child
//! subtrees when the chat is painted.

pub mod avatar;
pub mod chat_item;
pub mod chat_root;
pub mod chat_segment;
pub mod composer;
pub mod launchpad;

pub use avatar::AvatarProps;
pub use chat_item::{ChatItem, ChatItemProps};
pub use chat_root::{ChatRoot, ChatRootProps};
pub use chat_segment::{ChatSegment, SegmentStatus};
pub use composer::{Composer, ComposerEvent, ComposerProps};
pub use launchpad::{Launchpad, LaunchpadProps};
