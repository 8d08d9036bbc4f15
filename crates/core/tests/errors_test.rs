use std::error::Error;
use planner_core::errors::{PlannerError, PlannerResult};

#[test]
fn test_planner_error_display() {
    let not_found = PlannerError::NotFound("Schedule not found".to_string());
    let validation = PlannerError::Validation("Timeslot has no name".to_string());
    let storage = PlannerError::Storage(eyre::eyre!("Disk full"));
    let internal = PlannerError::Internal(Box::new(std::io::Error::new(
        std::io::ErrorKind::Other,
        "Internal error",
    )));

    assert_eq!(
        not_found.to_string(),
        "Resource not found: Schedule not found"
    );
    assert_eq!(
        validation.to_string(),
        "Validation error: Timeslot has no name"
    );
    assert!(storage.to_string().contains("Storage error:"));
    assert!(internal.to_string().contains("Internal error:"));
}

#[test]
fn test_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::Other, "IO error");
    let planner_error = PlannerError::Internal(Box::new(io_error));

    assert!(planner_error.source().is_some());
}

#[test]
fn test_planner_result() {
    let result: PlannerResult<i32> = Ok(42);
    assert_eq!(result.unwrap(), 42);

    let result: PlannerResult<i32> = Err(PlannerError::NotFound("Not found".to_string()));
    assert!(result.is_err());
}

#[test]
fn test_from_eyre_report() {
    fn save() -> PlannerResult<()> {
        let io: eyre::Result<()> = Err(eyre::eyre!("Failed to write Work.json"));
        io?;
        Ok(())
    }

    let err = save().unwrap_err();
    assert!(matches!(err, PlannerError::Storage(_)));
    assert!(err.to_string().contains("Work.json"));
}

#[test]
fn test_box_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::Other, "IO error");
    let boxed_error: Box<dyn Error + Send + Sync> = Box::new(io_error);
    let planner_error: PlannerError = boxed_error.into();

    assert!(planner_error.to_string().contains("IO error"));
}
