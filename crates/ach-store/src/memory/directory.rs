use crate::traits::ProfileDirectory;
use crate::{StoreError, StoreResult};
use ach_model::{LecturerId, LecturerProfile, StudentId, StudentProfile, UserId};
use async_trait::async_trait;
use dashmap::DashMap;

/// Profile directory seeded directly by callers.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    students: DashMap<StudentId, StudentProfile>,
    lecturers: DashMap<LecturerId, LecturerProfile>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_student(&self, profile: StudentProfile) {
        self.students.insert(profile.id, profile);
    }

    pub fn insert_lecturer(&self, profile: LecturerProfile) {
        self.lecturers.insert(profile.id, profile);
    }
}

#[async_trait]
impl ProfileDirectory for InMemoryDirectory {
    async fn student_by_user(&self, user: UserId) -> StoreResult<StudentProfile> {
        self.students
            .iter()
            .find(|p| p.user_id == user)
            .map(|p| p.value().clone())
            .ok_or_else(|| StoreError::NotFound(format!("no student profile for user {user}")))
    }

    async fn student_by_id(&self, id: StudentId) -> StoreResult<StudentProfile> {
        self.students
            .get(&id)
            .map(|p| p.clone())
            .ok_or_else(|| StoreError::NotFound(format!("student {id} not found")))
    }

    async fn lecturer_by_user(&self, user: UserId) -> StoreResult<LecturerProfile> {
        self.lecturers
            .iter()
            .find(|p| p.user_id == user)
            .map(|p| p.value().clone())
            .ok_or_else(|| StoreError::NotFound(format!("no lecturer profile for user {user}")))
    }

    async fn lecturer_by_id(&self, id: LecturerId) -> StoreResult<LecturerProfile> {
        self.lecturers
            .get(&id)
            .map(|p| p.clone())
            .ok_or_else(|| StoreError::NotFound(format!("lecturer {id} not found")))
    }

    async fn student_ids_by_advisor(&self, lecturer: LecturerId) -> StoreResult<Vec<StudentId>> {
        Ok(self
            .students
            .iter()
            .filter(|p| p.advisor_id == Some(lecturer))
            .map(|p| p.id)
            .collect())
    }

    async fn assign_advisor(
        &self,
        student: StudentId,
        advisor: Option<LecturerId>,
    ) -> StoreResult<StudentProfile> {
        let mut profile = self
            .students
            .get_mut(&student)
            .ok_or_else(|| StoreError::NotFound(format!("student {student} not found")))?;
        profile.advisor_id = advisor;
        Ok(profile.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn advisor_assignment_drives_advisee_lookup() {
        let directory = InMemoryDirectory::new();
        let lecturer = LecturerProfile::new(UserId::new(), "L-1");
        let student = StudentProfile::new(UserId::new(), "S-1");
        let (lecturer_id, student_id, student_user) = (lecturer.id, student.id, student.user_id);
        directory.insert_lecturer(lecturer);
        directory.insert_student(student);

        assert!(directory
            .student_ids_by_advisor(lecturer_id)
            .await
            .unwrap()
            .is_empty());

        let updated = directory
            .assign_advisor(student_id, Some(lecturer_id))
            .await
            .unwrap();
        assert_eq!(updated.advisor_id, Some(lecturer_id));
        assert_eq!(
            directory.student_ids_by_advisor(lecturer_id).await.unwrap(),
            vec![student_id]
        );
        assert_eq!(
            directory.student_by_user(student_user).await.unwrap().id,
            student_id
        );
        assert!(directory
            .assign_advisor(StudentId::new(), None)
            .await
            .unwrap_err()
            .is_not_found());
        assert!(directory
            .lecturer_by_user(student_user)
            .await
            .unwrap_err()
            .is_not_found());
    }
}
