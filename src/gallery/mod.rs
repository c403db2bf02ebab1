pub mod background;
pub mod carousel;
pub mod hit;
pub mod input;
pub mod item;
pub mod scroll;
pub mod viewport;

pub use carousel::{BoundsMode, Carousel, CarouselOptions, IndicatorState, Slide};
pub use scroll::{Direction, ScrollState};
pub use viewport::{PerspectiveCamera, Screen, Viewport};
