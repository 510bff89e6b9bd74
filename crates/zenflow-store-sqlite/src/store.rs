//! The SQLite implementation of [`PlanStore`].

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;
use zenflow_core::{
  instance::{InsertOutcome, NewInstance, OccurrenceState, PlanInstance},
  plan::{FlagChange, FlagWrite, NewPlan, PlanPatch, PlanTemplate},
  push::PushAddress,
  store::PlanStore,
};

use crate::{
  Result,
  encode::{
    INSTANCE_COLUMNS, PLAN_COLUMNS, RawInstance, RawPlan, RawPushAddress,
    encode_checklist, encode_date, encode_dt, encode_repeat_type, encode_uuid,
  },
  schema::SCHEMA,
};

/// Owner ids bound per `IN (...)` query, well under SQLite's
/// bound-parameter limit.
const MAX_BOUND_IDS: usize = 500;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A ZenFlow plan store backed by a single SQLite file.
///
/// Cloning is cheap, the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, used by tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Fetch a template by id regardless of owner.
  async fn plan_by_id(&self, id: Uuid) -> Result<Option<PlanTemplate>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawPlan> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {PLAN_COLUMNS} FROM daily_plans WHERE id = ?1"),
            rusqlite::params![id_str],
            RawPlan::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawPlan::into_plan).transpose()
  }

  async fn instance_by_id(&self, id: Uuid) -> Result<Option<PlanInstance>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawInstance> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {INSTANCE_COLUMNS} FROM plan_instances WHERE id = ?1"),
            rusqlite::params![id_str],
            RawInstance::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawInstance::into_instance).transpose()
  }

  /// Write every mutable column of `plan` back to its row.
  async fn write_plan(&self, plan: &PlanTemplate) -> Result<bool> {
    let id_str         = encode_uuid(plan.id);
    let user_id_str    = encode_uuid(plan.user_id);
    let name           = plan.name.clone();
    let color          = plan.color.clone();
    let emoji          = plan.emoji.clone();
    let duration       = plan.duration_minutes;
    let notes          = plan.notes.clone();
    let checklist_str  = encode_checklist(&plan.checklist)?;
    let scheduled_str  = plan.scheduled_date.map(encode_date);
    let is_anytime     = plan.is_anytime;
    let repeat_str     = encode_repeat_type(plan.repeat_type);
    let start_time     = plan.start_time.clone();
    let end_time       = plan.end_time.clone();
    let at_start       = plan.reminder_at_start;
    let at_end         = plan.reminder_at_end;
    let before_minutes = plan.reminder_before_minutes;
    let updated_str    = encode_dt(plan.updated_at);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE daily_plans SET
             name = ?3, color = ?4, emoji = ?5, duration_minutes = ?6,
             notes = ?7, checklist = ?8, scheduled_date = ?9, is_anytime = ?10,
             repeat_type = ?11, start_time = ?12, end_time = ?13,
             reminder_at_start = ?14, reminder_at_end = ?15,
             reminder_before_minutes = ?16, updated_at = ?17
           WHERE id = ?1 AND user_id = ?2",
          rusqlite::params![
            id_str,
            user_id_str,
            name,
            color,
            emoji,
            duration,
            notes,
            checklist_str,
            scheduled_str,
            is_anytime,
            repeat_str,
            start_time,
            end_time,
            at_start,
            at_end,
            before_minutes,
            updated_str,
          ],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }
}

// ─── PlanStore impl ──────────────────────────────────────────────────────────

impl PlanStore for SqliteStore {
  type Error = crate::Error;

  // ── Templates ─────────────────────────────────────────────────────────────

  async fn create_plan(&self, input: NewPlan) -> Result<PlanTemplate> {
    let now = Utc::now();
    let plan = PlanTemplate {
      id:                      Uuid::new_v4(),
      user_id:                 input.user_id,
      name:                    input.name,
      color:                   input.color,
      emoji:                   input.emoji,
      duration_minutes:        input.duration_minutes,
      notes:                   input.notes,
      checklist:               input.checklist,
      scheduled_date:          input.scheduled_date,
      is_anytime:              input.is_anytime,
      repeat_type:             input.repeat_type,
      start_time:              input.start_time,
      end_time:                input.end_time,
      reminder_at_start:       input.reminder_at_start,
      reminder_at_end:         input.reminder_at_end,
      reminder_before_minutes: input.reminder_before_minutes,
      is_completed:            false,
      is_skipped:              false,
      created_at:              now,
      updated_at:              now,
    };

    let id_str         = encode_uuid(plan.id);
    let user_id_str    = encode_uuid(plan.user_id);
    let name           = plan.name.clone();
    let color          = plan.color.clone();
    let emoji          = plan.emoji.clone();
    let duration       = plan.duration_minutes;
    let notes          = plan.notes.clone();
    let checklist_str  = encode_checklist(&plan.checklist)?;
    let scheduled_str  = plan.scheduled_date.map(encode_date);
    let is_anytime     = plan.is_anytime;
    let repeat_str     = encode_repeat_type(plan.repeat_type);
    let start_time     = plan.start_time.clone();
    let end_time       = plan.end_time.clone();
    let at_start       = plan.reminder_at_start;
    let at_end         = plan.reminder_at_end;
    let before_minutes = plan.reminder_before_minutes;
    let at_str         = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO daily_plans ({PLAN_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                     ?11, ?12, ?13, ?14, ?15, ?16, 0, 0, ?17, ?17)"
          ),
          rusqlite::params![
            id_str,
            user_id_str,
            name,
            color,
            emoji,
            duration,
            notes,
            checklist_str,
            scheduled_str,
            is_anytime,
            repeat_str,
            start_time,
            end_time,
            at_start,
            at_end,
            before_minutes,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(plan)
  }

  async fn get_plan(&self, id: Uuid, user_id: Uuid) -> Result<Option<PlanTemplate>> {
    Ok(
      self
        .plan_by_id(id)
        .await?
        .filter(|plan| plan.user_id == user_id),
    )
  }

  async fn list_plans(&self, user_id: Uuid) -> Result<Vec<PlanTemplate>> {
    let user_id_str = encode_uuid(user_id);

    let raws: Vec<RawPlan> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PLAN_COLUMNS} FROM daily_plans
           WHERE user_id = ?1
           ORDER BY scheduled_date IS NULL, scheduled_date, created_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user_id_str], RawPlan::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPlan::into_plan).collect()
  }

  async fn update_plan(
    &self,
    id:      Uuid,
    user_id: Uuid,
    patch:   PlanPatch,
  ) -> Result<Option<PlanTemplate>> {
    let Some(mut plan) = self.get_plan(id, user_id).await? else {
      return Ok(None);
    };

    patch.apply(&mut plan);
    plan.updated_at = Utc::now();

    if !self.write_plan(&plan).await? {
      return Ok(None);
    }
    Ok(Some(plan))
  }

  async fn change_plan_flags(
    &self,
    id:      Uuid,
    user_id: Uuid,
    change:  FlagChange,
  ) -> Result<FlagWrite> {
    let assignment = match change {
      FlagChange::SetCompleted(true) => "is_completed = 1",
      FlagChange::SetCompleted(false) => "is_completed = 0",
      FlagChange::SetSkipped(true) => "is_skipped = 1",
      FlagChange::SetSkipped(false) => "is_skipped = 0",
      FlagChange::ToggleCompleted => "is_completed = NOT is_completed",
      FlagChange::ToggleSkipped => "is_skipped = NOT is_skipped",
      FlagChange::Clear => "is_completed = 0, is_skipped = 0",
    };
    let guard = if change.requires_not_completed() { " AND is_completed = 0" } else { "" };
    let sql = format!(
      "UPDATE daily_plans SET {assignment}, updated_at = ?3
       WHERE id = ?1 AND user_id = ?2{guard}"
    );

    let id_str      = encode_uuid(id);
    let user_id_str = encode_uuid(user_id);
    let at_str      = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(&sql, rusqlite::params![id_str, user_id_str, at_str])?)
      })
      .await?;

    // Nothing changed either because the row is gone or because the guard
    // refused it; the stored row tells which.
    Ok(match self.get_plan(id, user_id).await? {
      None => FlagWrite::NotFound,
      Some(plan) if changed > 0 => FlagWrite::Updated(plan),
      Some(_) => FlagWrite::Conflict,
    })
  }

  async fn delete_plan(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
    let id_str      = encode_uuid(id);
    let user_id_str = encode_uuid(user_id);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM daily_plans WHERE id = ?1 AND user_id = ?2",
          rusqlite::params![id_str, user_id_str],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn purge_user(&self, user_id: Uuid) -> Result<usize> {
    let user_id_str = encode_uuid(user_id);

    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM plan_instances WHERE user_id = ?1",
          rusqlite::params![user_id_str],
        )?;
        let plans = tx.execute(
          "DELETE FROM daily_plans WHERE user_id = ?1",
          rusqlite::params![user_id_str],
        )?;
        tx.execute(
          "DELETE FROM push_tokens WHERE user_id = ?1",
          rusqlite::params![user_id_str],
        )?;
        tx.commit()?;
        Ok(plans)
      })
      .await?;

    Ok(deleted)
  }

  async fn plans_for_scan(&self, date: NaiveDate) -> Result<Vec<PlanTemplate>> {
    let date_str = encode_date(date);

    let raws: Vec<RawPlan> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PLAN_COLUMNS} FROM daily_plans
           WHERE (repeat_type = 'once' AND scheduled_date = ?1 AND is_completed = 0)
              OR repeat_type != 'once'
           ORDER BY created_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![date_str], RawPlan::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPlan::into_plan).collect()
  }

  // ── Instances ─────────────────────────────────────────────────────────────

  async fn find_instance(
    &self,
    plan_id: Uuid,
    date:    NaiveDate,
  ) -> Result<Option<PlanInstance>> {
    let plan_id_str = encode_uuid(plan_id);
    let date_str    = encode_date(date);

    let raw: Option<RawInstance> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {INSTANCE_COLUMNS} FROM plan_instances
               WHERE plan_id = ?1 AND instance_date = ?2"
            ),
            rusqlite::params![plan_id_str, date_str],
            RawInstance::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawInstance::into_instance).transpose()
  }

  async fn insert_instance(&self, input: NewInstance) -> Result<InsertOutcome> {
    let instance = PlanInstance {
      id:            Uuid::new_v4(),
      plan_id:       input.plan_id,
      user_id:       input.user_id,
      instance_date: input.instance_date,
      is_completed:  input.state.is_completed(),
      is_skipped:    input.state.is_skipped(),
      completed_at:  input.state.completed_at(input.now),
      created_at:    input.now,
      updated_at:    input.now,
    };

    let id_str        = encode_uuid(instance.id);
    let plan_id_str   = encode_uuid(instance.plan_id);
    let user_id_str   = encode_uuid(instance.user_id);
    let date_str      = encode_date(instance.instance_date);
    let is_completed  = instance.is_completed;
    let is_skipped    = instance.is_skipped;
    let completed_str = instance.completed_at.map(encode_dt);
    let at_str        = encode_dt(instance.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          &format!(
            "INSERT INTO plan_instances ({INSTANCE_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
             ON CONFLICT (plan_id, instance_date) DO NOTHING"
          ),
          rusqlite::params![
            id_str,
            plan_id_str,
            user_id_str,
            date_str,
            is_completed,
            is_skipped,
            completed_str,
            at_str,
          ],
        )?)
      })
      .await?;

    if inserted == 0 {
      return Ok(InsertOutcome::AlreadyExists);
    }
    Ok(InsertOutcome::Inserted(instance))
  }

  async fn update_instance(
    &self,
    id:           Uuid,
    state:        OccurrenceState,
    completed_at: Option<DateTime<Utc>>,
  ) -> Result<Option<PlanInstance>> {
    let id_str        = encode_uuid(id);
    let is_completed  = state.is_completed();
    let is_skipped    = state.is_skipped();
    let completed_str = completed_at.map(encode_dt);
    let at_str        = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE plan_instances
           SET is_completed = ?2, is_skipped = ?3, completed_at = ?4, updated_at = ?5
           WHERE id = ?1",
          rusqlite::params![id_str, is_completed, is_skipped, completed_str, at_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.instance_by_id(id).await
  }

  async fn list_instances(&self, plan_id: Uuid) -> Result<Vec<PlanInstance>> {
    let plan_id_str = encode_uuid(plan_id);

    let raws: Vec<RawInstance> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {INSTANCE_COLUMNS} FROM plan_instances
           WHERE plan_id = ?1
           ORDER BY instance_date"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![plan_id_str], RawInstance::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawInstance::into_instance).collect()
  }

  // ── Push addresses ────────────────────────────────────────────────────────

  async fn register_push_address(
    &self,
    user_id: Uuid,
    address: String,
  ) -> Result<PushAddress> {
    let user_id_str = encode_uuid(user_id);
    let at_str      = encode_dt(Utc::now());

    let raw: RawPushAddress = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO push_tokens (expo_push_token, user_id, created_at)
           VALUES (?1, ?2, ?3)
           ON CONFLICT (expo_push_token) DO UPDATE SET user_id = excluded.user_id",
          rusqlite::params![address, user_id_str, at_str],
        )?;
        Ok(conn.query_row(
          "SELECT expo_push_token, user_id, created_at
           FROM push_tokens WHERE expo_push_token = ?1",
          rusqlite::params![address],
          RawPushAddress::from_row,
        )?)
      })
      .await?;

    raw.into_push_address()
  }

  async fn remove_push_address(&self, address: &str) -> Result<bool> {
    let address = address.to_owned();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM push_tokens WHERE expo_push_token = ?1",
          rusqlite::params![address],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn push_addresses_for(&self, user_ids: &[Uuid]) -> Result<Vec<PushAddress>> {
    if user_ids.is_empty() {
      return Ok(Vec::new());
    }
    let ids: Vec<String> = user_ids.iter().copied().map(encode_uuid).collect();

    let raws: Vec<RawPushAddress> = self
      .conn
      .call(move |conn| {
        let mut rows = Vec::new();
        for chunk in ids.chunks(MAX_BOUND_IDS) {
          let placeholders = vec!["?"; chunk.len()].join(", ");
          let mut stmt = conn.prepare(&format!(
            "SELECT expo_push_token, user_id, created_at FROM push_tokens
             WHERE user_id IN ({placeholders})"
          ))?;
          let found = stmt
            .query_map(rusqlite::params_from_iter(chunk), RawPushAddress::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          rows.extend(found);
        }
        Ok(rows)
      })
      .await?;

    let mut addresses = raws
      .into_iter()
      .map(RawPushAddress::into_push_address)
      .collect::<Result<Vec<_>>>()?;
    addresses.sort_by_key(|a| a.created_at);
    Ok(addresses)
  }

  async fn all_push_addresses(&self) -> Result<Vec<String>> {
    let addresses = self
      .conn
      .call(|conn| {
        let mut stmt = conn
          .prepare("SELECT expo_push_token FROM push_tokens ORDER BY created_at")?;
        let rows = stmt
          .query_map([], |row| row.get::<_, String>(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(addresses)
  }
}
