//! Разреженные слои нейронной сети с пространственной топологией.
//!
//! Каждый нейрон слоя получает случайные координаты в единичном кубе,
//! а его входные связи выбираются из предыдущего слоя либо равномерно,
//! либо с учетом расстояния (ближние нейроны выбираются чаще).
//! Слой умеет считать прямой проход, обратное распространение градиента
//! и производную по направлению (R-оператор).

pub mod activation;
pub mod autodiff;
pub mod chooser;
pub mod config;
pub mod coords;
pub mod dense;
pub mod error;
pub mod layer_topology;
pub mod net;
pub mod sparse_layer;

#[cfg(test)]
mod check;

pub use activation::*;
pub use autodiff::*;
pub use chooser::*;
pub use config::*;
pub use coords::*;
pub use error::*;
pub use layer_topology::*;
pub use net::*;
pub use sparse_layer::*;

use std::collections::HashMap;
use itertools::Itertools;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
