mod test_join_failures;
mod test_session_failure_drops_participant;
