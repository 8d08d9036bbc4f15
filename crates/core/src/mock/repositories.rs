use std::collections::BTreeMap;

use mockall::mock;

use crate::models::{Schedule, ScheduleId};
use crate::repository::ScheduleRepository;

// Mock persistence collaborator for testing
mock! {
    pub ScheduleRepo {}

    impl ScheduleRepository for ScheduleRepo {
        fn load_all(&self) -> eyre::Result<BTreeMap<ScheduleId, Schedule>>;

        fn save(&self, schedule: &Schedule) -> eyre::Result<()>;

        fn delete(&self, schedule: &Schedule) -> eyre::Result<()>;

        fn generate_file_name(&self, name: &str) -> eyre::Result<String>;
    }
}

impl MockScheduleRepo {
    /// Mock with an empty store that accepts every save and delete and hands
    /// out `<name>.json` file names.
    pub fn permissive() -> Self {
        let mut repo = Self::new();
        repo.expect_load_all().returning(|| Ok(BTreeMap::new()));
        repo.expect_save().returning(|_| Ok(()));
        repo.expect_delete().returning(|_| Ok(()));
        repo.expect_generate_file_name()
            .returning(|name| Ok(format!("{}.json", name)));
        repo
    }
}
