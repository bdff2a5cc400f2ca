//! Migration _202401201200_create_chart_of_accounts_migration
//!
//! Chart of accounts and the accounts that hang off it. Every statement is
//! `IF NOT EXISTS`, so a run interrupted halfway can simply be repeated.

use monarch::migration::{Migration, MigrationContext};
use monarch::DbError;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS chart_of_accounts (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        code VARCHAR(50) NOT NULL UNIQUE,
        name VARCHAR(255) NOT NULL,
        account_type VARCHAR(50) NOT NULL,
        parent_id UUID REFERENCES chart_of_accounts(id) ON DELETE SET NULL,
        is_active BOOLEAN NOT NULL DEFAULT true,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_chart_of_accounts_parent_id ON chart_of_accounts(parent_id)",
    r#"
    CREATE TABLE IF NOT EXISTS accounts (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        chart_of_account_id UUID NOT NULL REFERENCES chart_of_accounts(id) ON DELETE RESTRICT,
        code VARCHAR(50) NOT NULL UNIQUE,
        name VARCHAR(255) NOT NULL,
        normal_balance VARCHAR(10) NOT NULL,
        currency_code VARCHAR(3) NOT NULL DEFAULT 'USD',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_accounts_chart_of_account_id ON accounts(chart_of_account_id)",
];

#[derive(Debug, Default)]
pub struct CreateChartOfAccountsMigration;

impl Migration for CreateChartOfAccountsMigration {
    fn run(&self, ctx: &MigrationContext<'_>) -> Result<(), DbError> {
        for sql in STATEMENTS {
            ctx.execute(sql, &[])?;
        }
        Ok(())
    }
}
