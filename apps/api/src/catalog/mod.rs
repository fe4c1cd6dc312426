// The hosted catalog tables: companies, roles, personas. Mostly reads; a
// posted role arrives together with its persona.

pub mod handlers;
pub mod posting;
pub mod queries;
