//! Models command handler.

use lumina_core::providers::models;

pub fn list(current: &str) {
    print!("{}", models::format_table(current));
}
