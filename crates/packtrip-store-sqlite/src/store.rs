//! [`SqliteStore`] — the SQLite implementation of [`TripStore`].

use std::path::Path;

use chrono::{NaiveDate, Utc};
use packtrip_core::{
  model::{
    Availability, Message, NewMessage, NewTrip, NewUser, Participant, ParticipantRole,
    Preferences, PreferencesUpdate, Trip, TripState, User, Vote, VoteAction,
  },
  payload::MessagePayload,
  store::TripStore,
};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    RawAvailability, RawMessage, RawParticipant, RawPreferences, RawTrip, RawVote, encode_date,
    encode_dt, encode_payload, username_slug,
  },
  schema::SCHEMA,
};

const TRIP_COLUMNS: &str =
  "trip_id, title, destination, start_date, end_date, budget, state, invite_token, created_at";

const MESSAGE_COLUMNS: &str = "id, trip_id, user_id, kind, content, payload_json, timestamp";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A PackTrip store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
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

  /// Open an in-memory store — useful for testing.
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

  async fn fetch_trip(&self, trip_id: &str) -> Result<Option<Trip>> {
    let trip_id = trip_id.to_owned();
    let raw: Option<RawTrip> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {TRIP_COLUMNS} FROM trips WHERE trip_id = ?1"),
              rusqlite::params![trip_id],
              read_trip_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawTrip::into_trip).transpose()
  }

  async fn fetch_message(&self, id: i64) -> Result<Message> {
    let raw: Option<RawMessage> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
              rusqlite::params![id],
              read_message_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.ok_or(Error::MessageNotFound(id))?.into_message()
  }

  /// Read the current state and enforce the forward-only rule against the
  /// requested target.
  async fn check_forward(&self, trip_id: &str, next: TripState) -> Result<()> {
    let trip = self
      .fetch_trip(trip_id)
      .await?
      .ok_or_else(|| Error::TripNotFound(trip_id.to_owned()))?;
    if !trip.state.can_advance_to(next) {
      return Err(Error::BackwardTransition {
        trip_id: trip_id.to_owned(),
        from:    trip.state.as_str().to_owned(),
        to:      next.as_str().to_owned(),
      });
    }
    Ok(())
  }
}

// ─── Row readers ─────────────────────────────────────────────────────────────

fn read_trip_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTrip> {
  Ok(RawTrip {
    trip_id:      row.get(0)?,
    title:        row.get(1)?,
    destination:  row.get(2)?,
    start_date:   row.get(3)?,
    end_date:     row.get(4)?,
    budget:       row.get(5)?,
    state:        row.get(6)?,
    invite_token: row.get(7)?,
    created_at:   row.get(8)?,
  })
}

fn read_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawMessage> {
  Ok(RawMessage {
    id:           row.get(0)?,
    trip_id:      row.get(1)?,
    user_id:      row.get(2)?,
    kind:         row.get(3)?,
    content:      row.get(4)?,
    payload_json: row.get(5)?,
    timestamp:    row.get(6)?,
  })
}

fn read_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
  Ok(User {
    id:           row.get(0)?,
    username:     row.get(1)?,
    display_name: row.get(2)?,
    home_city:    row.get(3)?,
    color:        row.get(4)?,
  })
}

/// Insert a message inside an existing transaction-ish scope and return its
/// rowid. Shared by `append_message` and `finalize_generation`.
fn insert_message(
  conn: &rusqlite::Connection,
  input: &NewMessage,
  payload_kind: Option<&str>,
  payload_json: Option<&str>,
  timestamp: &str,
) -> rusqlite::Result<i64> {
  conn.execute(
    "INSERT INTO messages (trip_id, user_id, kind, content, payload_kind, payload_json, timestamp)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    rusqlite::params![
      input.trip_id,
      input.user_id,
      input.kind.as_str(),
      input.content,
      payload_kind,
      payload_json,
      timestamp
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

// ─── TripStore impl ──────────────────────────────────────────────────────────

impl TripStore for SqliteStore {
  type Error = Error;

  // ── Trips ─────────────────────────────────────────────────────────────

  async fn create_trip(&self, input: NewTrip) -> Result<Trip> {
    let invite_token = Uuid::new_v4().simple().to_string();
    let created_at = Utc::now();

    let trip = Trip {
      trip_id: input.trip_id,
      title: input.title,
      destination: input.destination,
      start_date: input.start_date,
      end_date: input.end_date,
      budget: input.budget,
      state: TripState::CollectingDates,
      invite_token,
      created_at,
    };

    let row = trip.clone();
    let inserted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          &format!("INSERT OR IGNORE INTO trips ({TRIP_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
          rusqlite::params![
            row.trip_id,
            row.title,
            row.destination,
            row.start_date.map(encode_date),
            row.end_date.map(encode_date),
            row.budget,
            row.state.as_str(),
            row.invite_token,
            encode_dt(row.created_at)
          ],
        )?;
        Ok(n)
      })
      .await?;

    if inserted == 0 {
      return Err(Error::TripIdTaken(trip.trip_id));
    }
    Ok(trip)
  }

  async fn get_trip(&self, trip_id: &str) -> Result<Option<Trip>> {
    self.fetch_trip(trip_id).await
  }

  async fn get_trip_by_invite_token(&self, token: &str) -> Result<Option<Trip>> {
    let token = token.to_owned();
    let raw: Option<RawTrip> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {TRIP_COLUMNS} FROM trips WHERE invite_token = ?1"),
              rusqlite::params![token],
              read_trip_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawTrip::into_trip).transpose()
  }

  async fn set_trip_state(&self, trip_id: &str, state: TripState) -> Result<()> {
    self.check_forward(trip_id, state).await?;
    let trip_id = trip_id.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE trips SET state = ?2 WHERE trip_id = ?1",
          rusqlite::params![trip_id, state.as_str()],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Users ─────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<User> {
    let slug = username_slug(&input.display_name);
    let color = input.color.unwrap_or_else(|| "#2864FF".to_owned());
    let display_name = input.display_name;
    let home_city = input.home_city;

    let user = self
      .conn
      .call(move |conn| {
        // First free candidate: the bare slug, then slug-2, slug-3, …
        let mut username = slug.clone();
        let mut suffix = 2u32;
        loop {
          let taken: bool = conn
            .query_row(
              "SELECT 1 FROM users WHERE username = ?1",
              rusqlite::params![username],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
          if !taken {
            break;
          }
          username = format!("{slug}-{suffix}");
          suffix += 1;
        }

        conn.execute(
          "INSERT INTO users (username, display_name, home_city, color) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![username, display_name, home_city, color],
        )?;
        Ok(User {
          id: conn.last_insert_rowid(),
          username,
          display_name,
          home_city,
          color,
        })
      })
      .await?;
    Ok(user)
  }

  async fn get_user(&self, id: i64) -> Result<Option<User>> {
    let user = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id, username, display_name, home_city, color FROM users WHERE id = ?1",
              rusqlite::params![id],
              read_user_row,
            )
            .optional()?,
        )
      })
      .await?;
    Ok(user)
  }

  async fn set_home_city(&self, user_id: i64, home_city: &str) -> Result<()> {
    let home_city = home_city.to_owned();
    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET home_city = ?2 WHERE id = ?1",
          rusqlite::params![user_id, home_city],
        )?)
      })
      .await?;
    if updated == 0 {
      return Err(Error::UserNotFound(user_id));
    }
    Ok(())
  }

  // ── Participants ──────────────────────────────────────────────────────

  async fn upsert_participant(
    &self,
    trip_id: &str,
    user_id: i64,
    role: ParticipantRole,
  ) -> Result<Participant> {
    let trip_id = trip_id.to_owned();
    let joined_at = encode_dt(Utc::now());
    {
      let trip_id = trip_id.clone();
      self
        .conn
        .call(move |conn| {
          conn.execute(
            "INSERT INTO trip_participants (trip_id, user_id, role, joined_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (trip_id, user_id) DO NOTHING",
            rusqlite::params![trip_id, user_id, role.as_str(), joined_at],
          )?;
          Ok(())
        })
        .await?;
    }

    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT p.trip_id, p.user_id, p.role, p.is_online,
                  p.has_submitted_preferences, p.has_submitted_availability, p.joined_at,
                  u.username, u.display_name, u.home_city, u.color
           FROM trip_participants p JOIN users u ON u.id = p.user_id
           WHERE p.trip_id = ?1 AND p.user_id = ?2",
          rusqlite::params![trip_id, user_id],
          read_participant_row,
        )?)
      })
      .await?;
    raw.into_participant()
  }

  async fn list_participants(&self, trip_id: &str) -> Result<Vec<Participant>> {
    let trip_id = trip_id.to_owned();
    let raws: Vec<RawParticipant> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT p.trip_id, p.user_id, p.role, p.is_online,
                  p.has_submitted_preferences, p.has_submitted_availability, p.joined_at,
                  u.username, u.display_name, u.home_city, u.color
           FROM trip_participants p JOIN users u ON u.id = p.user_id
           WHERE p.trip_id = ?1
           ORDER BY p.joined_at",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![trip_id], read_participant_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawParticipant::into_participant).collect()
  }

  async fn set_online(&self, trip_id: &str, user_id: i64, online: bool) -> Result<()> {
    let trip_id = trip_id.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE trip_participants SET is_online = ?3 WHERE trip_id = ?1 AND user_id = ?2",
          rusqlite::params![trip_id, user_id, online],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn mark_preferences_submitted(&self, trip_id: &str, user_id: i64) -> Result<()> {
    let trip_id = trip_id.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE trip_participants SET has_submitted_preferences = 1
           WHERE trip_id = ?1 AND user_id = ?2",
          rusqlite::params![trip_id, user_id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn mark_availability_submitted(&self, trip_id: &str, user_id: i64) -> Result<()> {
    let trip_id = trip_id.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE trip_participants SET has_submitted_availability = 1
           WHERE trip_id = ?1 AND user_id = ?2",
          rusqlite::params![trip_id, user_id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Feed ──────────────────────────────────────────────────────────────

  async fn append_message(&self, input: NewMessage) -> Result<Message> {
    let payload_kind = input.metadata.as_ref().map(|p| p.kind());
    let payload_json = input.metadata.as_ref().map(encode_payload).transpose()?;
    let timestamp = encode_dt(Utc::now());

    let id = {
      let input = input.clone();
      let timestamp = timestamp.clone();
      self
        .conn
        .call(move |conn| {
          Ok(insert_message(
            conn,
            &input,
            payload_kind,
            payload_json.as_deref(),
            &timestamp,
          )?)
        })
        .await?
    };
    self.fetch_message(id).await
  }

  async fn list_messages(&self, trip_id: &str) -> Result<Vec<Message>> {
    let trip_id = trip_id.to_owned();
    let raws: Vec<RawMessage> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {MESSAGE_COLUMNS} FROM messages WHERE trip_id = ?1 ORDER BY timestamp, id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![trip_id], read_message_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawMessage::into_message).collect()
  }

  async fn delete_message(&self, id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM messages WHERE id = ?1", rusqlite::params![id])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn has_payload_message(&self, trip_id: &str, payload_kind: &str) -> Result<bool> {
    let trip_id = trip_id.to_owned();
    let payload_kind = payload_kind.to_owned();
    let found = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM messages WHERE trip_id = ?1 AND payload_kind = ?2 LIMIT 1",
              rusqlite::params![trip_id, payload_kind],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;
    Ok(found)
  }

  async fn latest_payload_message(
    &self,
    trip_id: &str,
    payload_kind: &str,
  ) -> Result<Option<Message>> {
    let trip_id = trip_id.to_owned();
    let payload_kind = payload_kind.to_owned();
    let raw: Option<RawMessage> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE trip_id = ?1 AND payload_kind = ?2
                 ORDER BY timestamp DESC, id DESC LIMIT 1"
              ),
              rusqlite::params![trip_id, payload_kind],
              read_message_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawMessage::into_message).transpose()
  }

  async fn update_message_payload(&self, id: i64, payload: MessagePayload) -> Result<Message> {
    let payload_kind = payload.kind();
    let payload_json = encode_payload(&payload)?;
    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE messages SET payload_kind = ?2, payload_json = ?3 WHERE id = ?1",
          rusqlite::params![id, payload_kind, payload_json],
        )?)
      })
      .await?;
    if updated == 0 {
      return Err(Error::MessageNotFound(id));
    }
    self.fetch_message(id).await
  }

  async fn finalize_generation(
    &self,
    trip_id: &str,
    final_message: NewMessage,
    state: TripState,
    pending_id: Option<i64>,
  ) -> Result<Message> {
    self.check_forward(trip_id, state).await?;

    let trip_id = trip_id.to_owned();
    let payload_kind = final_message.metadata.as_ref().map(|p| p.kind());
    let payload_json = final_message.metadata.as_ref().map(encode_payload).transpose()?;
    let timestamp = encode_dt(Utc::now());

    let id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let id = insert_message(
          &tx,
          &final_message,
          payload_kind,
          payload_json.as_deref(),
          &timestamp,
        )?;
        tx.execute(
          "UPDATE trips SET state = ?2 WHERE trip_id = ?1",
          rusqlite::params![trip_id, state.as_str()],
        )?;
        if let Some(pending) = pending_id {
          tx.execute("DELETE FROM messages WHERE id = ?1", rusqlite::params![pending])?;
        }
        tx.commit()?;
        Ok(id)
      })
      .await?;
    self.fetch_message(id).await
  }

  // ── Availability ──────────────────────────────────────────────────────

  async fn upsert_availability(&self, mark: Availability) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO date_availability (trip_id, user_id, date, available)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (trip_id, user_id, date) DO UPDATE SET available = excluded.available",
          rusqlite::params![mark.trip_id, mark.user_id, encode_date(mark.date), mark.available],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn upsert_availability_batch(
    &self,
    trip_id: &str,
    user_id: i64,
    dates: Vec<(NaiveDate, bool)>,
  ) -> Result<Vec<Availability>> {
    let trip_id = trip_id.to_owned();
    let marks: Vec<Availability> = dates
      .into_iter()
      .map(|(date, available)| Availability {
        trip_id: trip_id.clone(),
        user_id,
        date,
        available,
      })
      .collect();

    let rows = marks.clone();
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for mark in &rows {
          tx.execute(
            "INSERT INTO date_availability (trip_id, user_id, date, available)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (trip_id, user_id, date) DO UPDATE SET available = excluded.available",
            rusqlite::params![mark.trip_id, mark.user_id, encode_date(mark.date), mark.available],
          )?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(marks)
  }

  async fn list_availability(&self, trip_id: &str) -> Result<Vec<Availability>> {
    let trip_id = trip_id.to_owned();
    let raws: Vec<RawAvailability> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT trip_id, user_id, date, available FROM date_availability
           WHERE trip_id = ?1 ORDER BY date, user_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![trip_id], |row| {
            Ok(RawAvailability {
              trip_id:   row.get(0)?,
              user_id:   row.get(1)?,
              date:      row.get(2)?,
              available: row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawAvailability::into_availability).collect()
  }

  // ── Votes ─────────────────────────────────────────────────────────────

  async fn toggle_vote(
    &self,
    trip_id: &str,
    user_id: i64,
    option_id: &str,
    reaction: &str,
  ) -> Result<(VoteAction, Vote)> {
    let trip_id = trip_id.to_owned();
    let option_id = option_id.to_owned();
    let reaction = reaction.to_owned();
    let now = encode_dt(Utc::now());

    let (action, timestamp) = {
      let trip_id = trip_id.clone();
      let option_id = option_id.clone();
      let reaction = reaction.clone();
      let now = now.clone();
      self
        .conn
        .call(move |conn| {
          let existing: Option<String> = conn
            .query_row(
              "SELECT timestamp FROM votes
               WHERE trip_id = ?1 AND user_id = ?2 AND option_id = ?3 AND reaction = ?4",
              rusqlite::params![trip_id, user_id, option_id, reaction],
              |row| row.get(0),
            )
            .optional()?;

          match existing {
            Some(ts) => {
              conn.execute(
                "DELETE FROM votes
                 WHERE trip_id = ?1 AND user_id = ?2 AND option_id = ?3 AND reaction = ?4",
                rusqlite::params![trip_id, user_id, option_id, reaction],
              )?;
              Ok((VoteAction::Removed, ts))
            }
            None => {
              conn.execute(
                "INSERT INTO votes (trip_id, user_id, option_id, reaction, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![trip_id, user_id, option_id, reaction, now],
              )?;
              Ok((VoteAction::Added, now))
            }
          }
        })
        .await?
    };

    let vote = RawVote { trip_id, user_id, option_id, reaction, timestamp }.into_vote()?;
    Ok((action, vote))
  }

  async fn list_votes(&self, trip_id: &str) -> Result<Vec<Vote>> {
    let trip_id = trip_id.to_owned();
    let raws: Vec<RawVote> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT trip_id, user_id, option_id, reaction, timestamp FROM votes
           WHERE trip_id = ?1 ORDER BY timestamp",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![trip_id], |row| {
            Ok(RawVote {
              trip_id:   row.get(0)?,
              user_id:   row.get(1)?,
              option_id: row.get(2)?,
              reaction:  row.get(3)?,
              timestamp: row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawVote::into_vote).collect()
  }

  // ── Preferences ───────────────────────────────────────────────────────

  async fn apply_preferences(
    &self,
    trip_id: &str,
    user_id: i64,
    update: PreferencesUpdate,
    raw_message: Option<String>,
  ) -> Result<Preferences> {
    let existing = self.get_preferences(trip_id, user_id).await?;

    let mut prefs = existing.unwrap_or_else(|| Preferences {
      trip_id: trip_id.to_owned(),
      user_id,
      ..Preferences::default()
    });

    // Merge: only provided fields overwrite; raw text is append-only.
    if let Some(v) = update.budget_preference {
      prefs.budget_preference = Some(v);
    }
    if let Some(v) = update.accommodation_type {
      prefs.accommodation_type = Some(v);
    }
    if let Some(v) = update.travel_style {
      prefs.travel_style = Some(v);
    }
    if let Some(v) = update.activities {
      prefs.activities = Some(v);
    }
    if let Some(v) = update.dietary_restrictions {
      prefs.dietary_restrictions = Some(v);
    }
    if let Some(v) = update.special_requirements {
      prefs.special_requirements = Some(v);
    }
    if let Some(raw) = raw_message {
      prefs.raw_preferences.push(raw);
    }

    let row = prefs.clone();
    let activities_json = row.activities.as_ref().map(serde_json::to_string).transpose()?;
    let raw_json = serde_json::to_string(&row.raw_preferences)?;
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO user_preferences
             (trip_id, user_id, budget_preference, accommodation_type, travel_style,
              activities, dietary_restrictions, special_requirements, raw_preferences)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
           ON CONFLICT (trip_id, user_id) DO UPDATE SET
             budget_preference    = excluded.budget_preference,
             accommodation_type   = excluded.accommodation_type,
             travel_style         = excluded.travel_style,
             activities           = excluded.activities,
             dietary_restrictions = excluded.dietary_restrictions,
             special_requirements = excluded.special_requirements,
             raw_preferences      = excluded.raw_preferences",
          rusqlite::params![
            row.trip_id,
            row.user_id,
            row.budget_preference,
            row.accommodation_type,
            row.travel_style,
            activities_json,
            row.dietary_restrictions,
            row.special_requirements,
            raw_json
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(prefs)
  }

  async fn get_preferences(&self, trip_id: &str, user_id: i64) -> Result<Option<Preferences>> {
    let trip_id = trip_id.to_owned();
    let raw: Option<RawPreferences> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT trip_id, user_id, budget_preference, accommodation_type, travel_style,
                      activities, dietary_restrictions, special_requirements, raw_preferences
               FROM user_preferences WHERE trip_id = ?1 AND user_id = ?2",
              rusqlite::params![trip_id, user_id],
              read_preferences_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawPreferences::into_preferences).transpose()
  }

  async fn list_preferences(&self, trip_id: &str) -> Result<Vec<Preferences>> {
    let trip_id = trip_id.to_owned();
    let raws: Vec<RawPreferences> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT trip_id, user_id, budget_preference, accommodation_type, travel_style,
                  activities, dietary_restrictions, special_requirements, raw_preferences
           FROM user_preferences WHERE trip_id = ?1 ORDER BY user_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![trip_id], read_preferences_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawPreferences::into_preferences).collect()
  }

  // ── Administrative reset ──────────────────────────────────────────────

  async fn reset_trip(&self, trip_id: &str, welcome: Vec<NewMessage>) -> Result<()> {
    // Pre-encode the welcome transcript so the closure stays sync-only.
    let encoded: Vec<(NewMessage, Option<&'static str>, Option<String>)> = welcome
      .into_iter()
      .map(|m| {
        let kind = m.metadata.as_ref().map(|p| p.kind());
        let json = m.metadata.as_ref().map(encode_payload).transpose()?;
        Ok((m, kind, json))
      })
      .collect::<Result<_>>()?;

    let trip_id = trip_id.to_owned();
    let now = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM date_availability WHERE trip_id = ?1", rusqlite::params![trip_id])?;
        tx.execute("DELETE FROM votes WHERE trip_id = ?1", rusqlite::params![trip_id])?;
        tx.execute("DELETE FROM messages WHERE trip_id = ?1", rusqlite::params![trip_id])?;
        tx.execute("DELETE FROM user_preferences WHERE trip_id = ?1", rusqlite::params![trip_id])?;
        tx.execute(
          "UPDATE trip_participants
           SET has_submitted_preferences = 0, has_submitted_availability = 0
           WHERE trip_id = ?1",
          rusqlite::params![trip_id],
        )?;
        tx.execute(
          "UPDATE trips SET state = ?2 WHERE trip_id = ?1",
          rusqlite::params![trip_id, TripState::CollectingDates.as_str()],
        )?;
        for (message, kind, json) in &encoded {
          insert_message(&tx, message, *kind, json.as_deref(), &now)?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

fn read_participant_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawParticipant> {
  Ok(RawParticipant {
    trip_id:                    row.get(0)?,
    user_id:                    row.get(1)?,
    role:                       row.get(2)?,
    is_online:                  row.get(3)?,
    has_submitted_preferences:  row.get(4)?,
    has_submitted_availability: row.get(5)?,
    joined_at:                  row.get(6)?,
    username:                   row.get(7)?,
    display_name:               row.get(8)?,
    home_city:                  row.get(9)?,
    color:                      row.get(10)?,
  })
}

fn read_preferences_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawPreferences> {
  Ok(RawPreferences {
    trip_id:              row.get(0)?,
    user_id:              row.get(1)?,
    budget_preference:    row.get(2)?,
    accommodation_type:   row.get(3)?,
    travel_style:         row.get(4)?,
    activities:           row.get(5)?,
    dietary_restrictions: row.get(6)?,
    special_requirements: row.get(7)?,
    raw_preferences:      row.get(8)?,
  })
}
