use chrono::Utc;
use redb::{Database as RedbDatabase, ReadableTable, TableDefinition, WriteTransaction};
use serde::de::DeserializeOwned;

use crate::error::{AppError, Result};
use crate::models::{
    Author, Comment, CommentWithAuthor, NewRoute, NewUser, Route, RouteChanges, RouteWithAuthor,
    User,
};

// Records, JSON encoded
const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");
const ROUTES: TableDefinition<u64, &[u8]> = TableDefinition::new("routes");
const COMMENTS: TableDefinition<u64, &[u8]> = TableDefinition::new("comments");
// (user id, route id) -> time favorited
const FAVORITES: TableDefinition<(u64, u64), i64> = TableDefinition::new("favorites");
// Unique indexes
const USERNAMES: TableDefinition<&str, u64> = TableDefinition::new("usernames");
const EMAILS: TableDefinition<&str, u64> = TableDefinition::new("emails");
const GOOGLE_IDS: TableDefinition<&str, u64> = TableDefinition::new("google_ids");
// Last id handed out, per record table
const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

pub struct Database {
    db: RedbDatabase,
}

impl Database {
    pub fn open(path: &str) -> Result<Self> {
        let db = RedbDatabase::create(path)?;

        // Initialize tables
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(ROUTES)?;
            let _ = write_txn.open_table(COMMENTS)?;
            let _ = write_txn.open_table(FAVORITES)?;
            let _ = write_txn.open_table(USERNAMES)?;
            let _ = write_txn.open_table(EMAILS)?;
            let _ = write_txn.open_table(GOOGLE_IDS)?;
            let _ = write_txn.open_table(SEQUENCES)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    // === User operations ===

    /// Insert a user. Fails with [`AppError::Duplicate`] when the username,
    /// email or Google id is already registered.
    pub fn create_user(&self, new: NewUser) -> Result<User> {
        let write_txn = self.db.begin_write()?;
        let user = {
            let mut usernames = write_txn.open_table(USERNAMES)?;
            if usernames.get(new.username.as_str())?.is_some() {
                return Err(AppError::Duplicate(
                    "Failed! Username is already in use!".into(),
                ));
            }
            let mut emails = write_txn.open_table(EMAILS)?;
            if emails.get(new.email.as_str())?.is_some() {
                return Err(AppError::Duplicate("Failed! Email is already in use!".into()));
            }
            let mut google_ids = write_txn.open_table(GOOGLE_IDS)?;
            if let Some(google_id) = new.google_id.as_deref() {
                if google_ids.get(google_id)?.is_some() {
                    return Err(AppError::Duplicate(
                        "Google account is already linked to another user".into(),
                    ));
                }
            }

            let now = Utc::now();
            let user = User {
                id: next_id(&write_txn, "users")?,
                username: new.username,
                email: new.email,
                password: new.password_hash,
                google_id: new.google_id,
                roles: new.roles,
                is_visible_on_map: true,
                current_lat: None,
                current_lon: None,
                created_at: now,
                updated_at: now,
            };

            usernames.insert(user.username.as_str(), user.id)?;
            emails.insert(user.email.as_str(), user.id)?;
            if let Some(google_id) = user.google_id.as_deref() {
                google_ids.insert(google_id, user.id)?;
            }
            let mut users = write_txn.open_table(USERS)?;
            users.insert(user.id, serde_json::to_vec(&user)?.as_slice())?;
            user
        };
        write_txn.commit()?;
        Ok(user)
    }

    pub fn find_user(&self, id: u64) -> Result<Option<User>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        match table.get(id)? {
            Some(data) => Ok(Some(serde_json::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    pub fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.find_user_by_index(USERNAMES, username)
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_user_by_index(EMAILS, email)
    }

    fn find_user_by_index(
        &self,
        index: TableDefinition<'static, &'static str, u64>,
        key: &str,
    ) -> Result<Option<User>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(index)?;
        let Some(id) = index.get(key)?.map(|v| v.value()) else {
            return Ok(None);
        };
        let users = read_txn.open_table(USERS)?;
        match users.get(id)? {
            Some(data) => Ok(Some(serde_json::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// Attach a Google account to an existing user.
    pub fn link_google_id(&self, user_id: u64, google_id: &str) -> Result<Option<User>> {
        let write_txn = self.db.begin_write()?;
        {
            let mut google_ids = write_txn.open_table(GOOGLE_IDS)?;
            let owner = google_ids.get(google_id)?.map(|v| v.value());
            match owner {
                Some(owner) if owner != user_id => {
                    return Err(AppError::Duplicate(
                        "Google account is already linked to another user".into(),
                    ));
                }
                Some(_) => {}
                None => {
                    google_ids.insert(google_id, user_id)?;
                }
            }
        }
        let user = update_record(&write_txn, USERS, user_id, |user: &mut User| {
            user.google_id = Some(google_id.to_string());
            user.updated_at = Utc::now();
        })?;
        if user.is_none() {
            return Ok(None);
        }
        write_txn.commit()?;
        Ok(user)
    }

    /// Returns `false` when the user does not exist.
    pub fn set_map_visibility(&self, user_id: u64, visible: bool) -> Result<bool> {
        self.update_user(user_id, |user| user.is_visible_on_map = visible)
    }

    /// Returns `false` when the user does not exist.
    pub fn set_location(&self, user_id: u64, lat: f64, lon: f64) -> Result<bool> {
        self.update_user(user_id, |user| {
            user.current_lat = Some(lat);
            user.current_lon = Some(lon);
        })
    }

    fn update_user(&self, user_id: u64, apply: impl FnOnce(&mut User)) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        let updated = update_record(&write_txn, USERS, user_id, |user: &mut User| {
            apply(user);
            user.updated_at = Utc::now();
        })?;
        write_txn.commit()?;
        Ok(updated.is_some())
    }

    // === Route operations ===

    pub fn create_route(&self, user_id: u64, new: NewRoute) -> Result<Route> {
        let write_txn = self.db.begin_write()?;
        let route = {
            let now = Utc::now();
            let route = Route {
                id: next_id(&write_txn, "routes")?,
                name: new.name,
                description: new.description,
                is_public: new.is_public,
                waypoints: new.waypoints,
                user_id,
                created_at: now,
                updated_at: now,
            };
            let mut table = write_txn.open_table(ROUTES)?;
            table.insert(route.id, serde_json::to_vec(&route)?.as_slice())?;
            route
        };
        write_txn.commit()?;
        Ok(route)
    }

    pub fn get_route(&self, id: u64) -> Result<Option<Route>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ROUTES)?;
        match table.get(id)? {
            Some(data) => Ok(Some(serde_json::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_route_with_author(&self, id: u64) -> Result<Option<RouteWithAuthor>> {
        let Some(route) = self.get_route(id)? else {
            return Ok(None);
        };
        Ok(self.with_authors(vec![route])?.pop())
    }

    /// Public routes with their author, newest first.
    pub fn list_public_routes(&self) -> Result<Vec<RouteWithAuthor>> {
        let routes = self.scan_routes(|route| route.is_public)?;
        self.with_authors(routes)
    }

    /// Routes owned by `user_id`, newest first.
    pub fn list_user_routes(&self, user_id: u64) -> Result<Vec<Route>> {
        self.scan_routes(|route| route.user_id == user_id)
    }

    fn scan_routes(&self, keep: impl Fn(&Route) -> bool) -> Result<Vec<Route>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ROUTES)?;
        let mut routes = Vec::new();
        for entry in table.iter()? {
            let (_, data) = entry?;
            let route: Route = serde_json::from_slice(data.value())?;
            if keep(&route) {
                routes.push(route);
            }
        }
        routes.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(routes)
    }

    pub fn update_route(&self, id: u64, changes: RouteChanges) -> Result<Option<Route>> {
        let write_txn = self.db.begin_write()?;
        let route = update_record(&write_txn, ROUTES, id, |route: &mut Route| {
            if let Some(name) = changes.name {
                route.name = name;
            }
            if let Some(description) = changes.description {
                route.description = Some(description);
            }
            if let Some(is_public) = changes.is_public {
                route.is_public = is_public;
            }
            if let Some(waypoints) = changes.waypoints {
                route.waypoints = waypoints;
            }
            route.updated_at = Utc::now();
        })?;
        write_txn.commit()?;
        Ok(route)
    }

    /// Delete a route together with its favorites and comments. Returns
    /// `false` when there was nothing to delete.
    pub fn delete_route(&self, id: u64) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        let deleted = {
            let mut routes = write_txn.open_table(ROUTES)?;
            let deleted = routes.remove(id)?.is_some();

            if deleted {
                let mut favorites = write_txn.open_table(FAVORITES)?;
                let mut stale = Vec::new();
                for entry in favorites.iter()? {
                    let (key, _) = entry?;
                    let (user_id, route_id) = key.value();
                    if route_id == id {
                        stale.push((user_id, route_id));
                    }
                }
                for key in stale {
                    favorites.remove(key)?;
                }

                let mut comments = write_txn.open_table(COMMENTS)?;
                let mut stale = Vec::new();
                for entry in comments.iter()? {
                    let (key, data) = entry?;
                    let comment: Comment = serde_json::from_slice(data.value())?;
                    if comment.route_id == id {
                        stale.push(key.value());
                    }
                }
                for key in stale {
                    comments.remove(key)?;
                }
            }
            deleted
        };
        write_txn.commit()?;
        Ok(deleted)
    }

    fn with_authors(&self, routes: Vec<Route>) -> Result<Vec<RouteWithAuthor>> {
        let read_txn = self.db.begin_read()?;
        let users = read_txn.open_table(USERS)?;
        routes
            .into_iter()
            .map(|route| -> Result<RouteWithAuthor> {
                let user = author(&users, route.user_id)?;
                Ok(RouteWithAuthor { route, user })
            })
            .collect()
    }

    // === Favorite operations ===

    /// Idempotent: favoriting twice keeps the first timestamp.
    pub fn add_favorite(&self, user_id: u64, route_id: u64) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(FAVORITES)?;
            if table.get((user_id, route_id))?.is_none() {
                table.insert((user_id, route_id), Utc::now().timestamp())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn remove_favorite(&self, user_id: u64, route_id: u64) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(FAVORITES)?;
            table.remove((user_id, route_id))?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Routes favorited by `user_id`, with their author.
    pub fn list_favorites(&self, user_id: u64) -> Result<Vec<RouteWithAuthor>> {
        let read_txn = self.db.begin_read()?;
        let favorites = read_txn.open_table(FAVORITES)?;
        let routes = read_txn.open_table(ROUTES)?;
        let users = read_txn.open_table(USERS)?;

        let mut result = Vec::new();
        for entry in favorites.range((user_id, 0)..=(user_id, u64::MAX))? {
            let (key, _) = entry?;
            let (_, route_id) = key.value();
            let Some(data) = routes.get(route_id)? else {
                continue;
            };
            let route: Route = serde_json::from_slice(data.value())?;
            let user = author(&users, route.user_id)?;
            result.push(RouteWithAuthor { route, user });
        }
        Ok(result)
    }

    // === Comment operations ===

    pub fn add_comment(&self, user_id: u64, route_id: u64, text: &str) -> Result<Comment> {
        let write_txn = self.db.begin_write()?;
        let comment = {
            let now = Utc::now();
            let comment = Comment {
                id: next_id(&write_txn, "comments")?,
                text: text.to_string(),
                route_id,
                user_id,
                created_at: now,
                updated_at: now,
            };
            let mut table = write_txn.open_table(COMMENTS)?;
            table.insert(comment.id, serde_json::to_vec(&comment)?.as_slice())?;
            comment
        };
        write_txn.commit()?;
        Ok(comment)
    }

    /// Comments on a route with their author, newest first.
    pub fn list_comments(&self, route_id: u64) -> Result<Vec<CommentWithAuthor>> {
        let read_txn = self.db.begin_read()?;
        let comments = read_txn.open_table(COMMENTS)?;
        let users = read_txn.open_table(USERS)?;

        let mut result = Vec::new();
        for entry in comments.iter()? {
            let (_, data) = entry?;
            let comment: Comment = serde_json::from_slice(data.value())?;
            if comment.route_id != route_id {
                continue;
            }
            let user = author(&users, comment.user_id)?;
            result.push(CommentWithAuthor { comment, user });
        }
        result.sort_by(|a, b| {
            (b.comment.created_at, b.comment.id).cmp(&(a.comment.created_at, a.comment.id))
        });
        Ok(result)
    }
}

fn next_id(txn: &WriteTransaction, sequence: &str) -> Result<u64> {
    let mut table = txn.open_table(SEQUENCES)?;
    let next = table.get(sequence)?.map(|v| v.value()).unwrap_or(0) + 1;
    table.insert(sequence, next)?;
    Ok(next)
}

/// Read-modify-write of one JSON record inside `txn`. `None` if absent.
fn update_record<T>(
    txn: &WriteTransaction,
    definition: TableDefinition<'static, u64, &'static [u8]>,
    id: u64,
    apply: impl FnOnce(&mut T),
) -> Result<Option<T>>
where
    T: serde::Serialize + DeserializeOwned,
{
    let mut table = txn.open_table(definition)?;
    let current: Option<T> = match table.get(id)? {
        Some(data) => Some(serde_json::from_slice(data.value())?),
        None => None,
    };
    let Some(mut record) = current else {
        return Ok(None);
    };
    apply(&mut record);
    table.insert(id, serde_json::to_vec(&record)?.as_slice())?;
    Ok(Some(record))
}

fn author(users: &impl ReadableTable<u64, &'static [u8]>, user_id: u64) -> Result<Option<Author>> {
    match users.get(user_id)? {
        Some(data) => {
            let user: User = serde_json::from_slice(data.value())?;
            Ok(Some(Author::from(&user)))
        }
        None => Ok(None),
    }
}
