mod google_calendar_mock;
mod page_engine;

// This file organizes the integration tests into a cohesive test suite.
// Each module tests a specific aspect of the application:
// - smoke_tests: Basic wiring of config, components and the page attach path
// - history_store: Store invariants and persisted record decoding
// - page_engine: Suggestion, injection and calendar switching on an in-memory page
// - page_actor: The engine driven through its mailbox, timers and snapshots
// - google_calendar_mock: Mocking the Google Calendar service for testing
// - redis_mock: Mocking Redis for testing without a real Redis instance
