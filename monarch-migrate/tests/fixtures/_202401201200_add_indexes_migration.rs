//! Migration _202401201200_add_indexes_migration

use monarch::migration::{Migration, MigrationContext};
use monarch::DbError;

#[derive(Debug, Default)]
pub struct AddIndexesMigration;

impl Migration for AddIndexesMigration {
    /// Move the datastore from one state to the next.
    ///
    /// Return an error to halt the run; the migration stays pending until `run`
    /// succeeds. Nothing is rolled back for you, so keep the logic idempotent or
    /// wrap it in a transaction.
    fn run(&self, ctx: &MigrationContext<'_>) -> Result<(), DbError> {
        Err(DbError::NotImplemented(ctx.identity().to_string()))
    }
}
