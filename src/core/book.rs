//! The construction book: every operation a shell can call
//!
//! `Book` composes authorization, lifecycle checks, batch planning and
//! the store. Each call takes the already-resolved acting [`Actor`];
//! resolving who is acting is the shell's job.

use std::io::Read;
use std::path::Path;

use chrono::Utc;

use crate::core::access::{self, Action};
use crate::core::boq_import::{self, ImportStats};
use crate::core::error::{GkError, Result};
use crate::core::identity::EntityId;
use crate::core::store::{self, Store};
use crate::core::team::{Actor, Role};
use crate::entities::{
    BoqItem, BoqItemChanges, EntryInput, EntryLine, NewBoqItem, NewProject, NewSheet, Project,
    Sheet, SheetDetail, SheetFilter, SheetSummary,
};

pub struct Book {
    store: Store,
}

impl Book {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(Store::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Store::open_in_memory()?))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    // =====================================================================
    // Identity
    // =====================================================================

    /// Make sure the four roles exist; safe to call any number of times
    pub fn ensure_roles(&mut self) -> Result<usize> {
        self.store.ensure_roles()
    }

    pub fn list_roles(&self) -> Result<Vec<Role>> {
        store::list_roles(self.store.conn())
    }

    /// Register the first administrator of an empty identity store
    ///
    /// Once any user exists this fails with an authorization error; later
    /// users are added by an administrator through [`Book::add_user`].
    pub fn bootstrap_admin(&mut self, username: &str) -> Result<Actor> {
        let admin = Actor::new(username, Role::Admin);
        if !store::list_users(self.store.conn(), None)?.is_empty() {
            return Err(GkError::Authorization {
                actor: admin.username,
                role: Role::Admin,
                action: "bootstrap an administrator in a populated store".to_string(),
            });
        }
        self.store.ensure_roles()?;
        self.store.add_user(&admin)?;
        tracing::info!(user = %admin.username, "bootstrapped administrator");
        Ok(admin)
    }

    pub fn add_user(&self, actor: &Actor, user: &Actor) -> Result<()> {
        access::require(access::can_manage_projects(actor), actor, "manage users")?;
        self.store.add_user(user)?;
        tracing::info!(user = %user.username, role = %user.role, by = %actor.username, "added user");
        Ok(())
    }

    /// Resolve an active user; anyone else is not an authenticated actor
    pub fn resolve_actor(&self, username: &str) -> Result<Actor> {
        store::find_actor(self.store.conn(), username)?
            .ok_or_else(|| GkError::not_found("user", username))
    }

    pub fn list_users(&self, role: Option<Role>) -> Result<Vec<Actor>> {
        store::list_users(self.store.conn(), role)
    }

    // =====================================================================
    // Projects
    // =====================================================================

    pub fn create_project(&self, actor: &Actor, new: NewProject) -> Result<Project> {
        access::require(access::can_manage_projects(actor), actor, "create projects")?;
        let project = new.into_project(Utc::now())?;
        self.store.insert_project(&project)?;
        tracing::info!(project = %project.code, id = %project.id, "created project");
        Ok(project)
    }

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        store::list_projects(self.store.conn())
    }

    /// The first (in a single-project book, the only) project
    pub fn first_project(&self) -> Result<Project> {
        store::first_project(self.store.conn())?.ok_or_else(|| GkError::not_found("project", "any"))
    }

    pub fn project_by_code(&self, code: &str) -> Result<Project> {
        store::project_by_code(self.store.conn(), code)?
            .ok_or_else(|| GkError::not_found("project", code))
    }

    // =====================================================================
    // Bill of quantities
    // =====================================================================

    pub fn add_boq_item(&self, actor: &Actor, project: &Project, new: NewBoqItem) -> Result<BoqItem> {
        access::require(access::can_manage_boq(actor), actor, "add BoQ items")?;
        let item = new.into_item(&project.id)?;
        store::insert_boq_item(self.store.conn(), &item)?;
        tracing::info!(project = %project.code, code = %item.code, "added BoQ item");
        Ok(item)
    }

    pub fn list_boq_items(&self, project: &Project) -> Result<Vec<BoqItem>> {
        store::list_boq_items(self.store.conn(), &project.id)
    }

    pub fn boq_item_by_code(&self, project: &Project, code: &str) -> Result<BoqItem> {
        store::boq_item_by_code(self.store.conn(), &project.id, code)?
            .ok_or_else(|| GkError::not_found("BoQ item", code))
    }

    /// Change an item's code; refused once any sheet entry uses the item
    pub fn rename_boq_item(
        &mut self,
        actor: &Actor,
        project: &Project,
        code: &str,
        new_code: &str,
    ) -> Result<BoqItem> {
        access::require(access::can_manage_boq(actor), actor, "rename BoQ items")?;
        let item = self.boq_item_by_code(project, code)?;
        self.store.rename_boq_item(&item.id, new_code)
    }

    /// Change an item's attributes; refused once any sheet entry uses the item
    pub fn update_boq_item(
        &mut self,
        actor: &Actor,
        project: &Project,
        code: &str,
        changes: BoqItemChanges,
    ) -> Result<BoqItem> {
        access::require(access::can_manage_boq(actor), actor, "edit BoQ items")?;
        let item = self.boq_item_by_code(project, code)?;
        let updated = changes.apply(&item)?;
        self.store.edit_boq_item(&updated)?;
        Ok(updated)
    }

    pub fn import_boq<R: Read>(
        &mut self,
        actor: &Actor,
        project: &Project,
        reader: R,
        dry_run: bool,
    ) -> Result<ImportStats> {
        access::require(access::can_manage_boq(actor), actor, "import BoQ items")?;
        boq_import::import_boq(&mut self.store, project, reader, dry_run)
    }

    // =====================================================================
    // Sheets
    // =====================================================================

    /// Sheet summaries, newest period first
    pub fn list_sheets(&self, project: &Project, filter: &SheetFilter) -> Result<Vec<SheetSummary>> {
        store::list_sheets(self.store.conn(), &project.id, filter)
    }

    /// Create a draft sheet owned by `actor`
    pub fn create_sheet(&mut self, actor: &Actor, project: &Project, new: NewSheet) -> Result<Sheet> {
        access::authorize(actor, Action::Create, None)?;
        let sheet = Sheet::create(project, actor, new, Utc::now())?;
        self.store.insert_sheet(&sheet)?;
        tracing::info!(
            sheet = %sheet.id,
            number = sheet.number,
            by = %actor.username,
            "created sheet"
        );
        Ok(sheet)
    }

    pub fn sheet_by_number(&self, project: &Project, number: u32) -> Result<Sheet> {
        store::sheet_by_number(self.store.conn(), &project.id, number)?
            .ok_or_else(|| GkError::not_found("sheet", format!("#{}", number)))
    }

    /// A sheet, its entries ordered by BoQ code, and whether `actor` may edit it
    pub fn get_sheet_detail(&self, actor: &Actor, sheet_id: &EntityId) -> Result<SheetDetail> {
        let conn = self.store.conn();
        let sheet = store::get_sheet(conn, sheet_id)?
            .ok_or_else(|| GkError::not_found("sheet", sheet_id))?;
        access::authorize(actor, Action::View, Some(&sheet))?;

        let entries = store::entry_lines(conn, sheet_id)?;
        let can_edit = access::can_perform(actor, Action::Edit, Some(&sheet));
        Ok(SheetDetail {
            sheet,
            entries,
            can_edit,
        })
    }

    /// Replace a sheet's entries with `desired`
    ///
    /// Authorization and the lifecycle check both run against the sheet
    /// as read under the write lock.
    pub fn apply_batch(
        &mut self,
        actor: &Actor,
        sheet_id: &EntityId,
        desired: &[EntryInput],
    ) -> Result<Vec<EntryLine>> {
        self.store.apply_batch(sheet_id, desired, |sheet| {
            access::authorize(actor, Action::Edit, Some(sheet))
        })
    }
}
