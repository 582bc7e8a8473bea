#![cfg_attr(not(test), no_std)]

pub mod altitude;
pub mod bmp280;
pub mod console;
pub mod render;
pub mod station;
