pub mod schema;
pub mod user;

pub use user::PostgresUserRepository;
