mod account_test;
mod query_test;
mod registration_test;
mod scenario_test;
