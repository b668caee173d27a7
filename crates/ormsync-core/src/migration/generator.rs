//! Schema diff generator.
//!
//! For each entity, in dependency order, either creates the table or alters
//! it toward the declared shape. Join tables for many-to-many relations are
//! emitted in a final pass once every primary table of the batch exists.
//!
//! Generation is idempotent: against a live schema that already matches the
//! descriptors, the output is empty. A foreign key deferred by one run is
//! added by the first later run that finds the referenced table.

use super::ddl::{foreign_key_name, index_name, DdlRenderer, ForeignKey};
use super::error::MigrationError;
use super::normalize::{normalize_default, normalize_type, quote_identifier, singularize};
use super::resolver::{DependencyResolver, ResolvedOrder};
use crate::catalog::{
    ColumnDescriptor, ColumnType, EntityCatalog, EntityDescriptor, RelationKind,
};
use crate::connection::Connection;
use crate::introspect::{LiveColumn, LiveColumns, LiveForeignKey, SchemaIntrospector};
use std::collections::HashSet;

/// A recoverable condition absorbed during generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationWarning {
    /// Entities in a dependency cycle; some of their foreign keys are deferred.
    DependencyCycle {
        /// Entity identifiers in the cycle.
        entities: Vec<String>,
    },
    /// A relation points at an entity that is neither in the batch nor known.
    MissingRelationTarget {
        /// Entity declaring the relation.
        entity: String,
        /// Relation field.
        field: String,
        /// Missing target entity.
        target: String,
    },
    /// A foreign key was omitted because the referenced table is not yet available.
    DeferredForeignKey {
        /// Referencing table.
        table: String,
        /// Referencing column.
        column: String,
        /// Referenced table.
        referenced_table: String,
    },
    /// A foreign key is missing on an existing table that cannot gain constraints in place.
    ForeignKeyRequiresRebuild {
        /// Referencing table.
        table: String,
        /// Referencing column.
        column: String,
        /// Referenced table.
        referenced_table: String,
    },
}

impl std::fmt::Display for GenerationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationWarning::DependencyCycle { entities } => write!(
                f,
                "dependency cycle between {}; foreign keys to later tables are deferred",
                entities.join(", ")
            ),
            GenerationWarning::MissingRelationTarget {
                entity,
                field,
                target,
            } => write!(
                f,
                "{}.{} references unknown entity {}; constraint omitted",
                entity, field, target
            ),
            GenerationWarning::DeferredForeignKey {
                table,
                column,
                referenced_table,
            } => write!(
                f,
                "foreign key {}.{} -> {} deferred until the referenced table exists",
                table, column, referenced_table
            ),
            GenerationWarning::ForeignKeyRequiresRebuild {
                table,
                column,
                referenced_table,
            } => write!(
                f,
                "foreign key {}.{} -> {} is missing and needs a table rebuild",
                table, column, referenced_table
            ),
        }
    }
}

/// Output of one generation run.
#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    /// Statements bringing the database to the declared shape.
    pub up: Vec<String>,
    /// Statements reverting `up`, in execution order.
    pub down: Vec<String>,
    /// Absorbed conditions.
    pub warnings: Vec<GenerationWarning>,
}

impl GenerationReport {
    /// Check if no migration is needed.
    pub fn is_empty(&self) -> bool {
        self.up.is_empty()
    }

    /// The up script; empty when no migration is needed.
    pub fn up_sql(&self) -> String {
        render_script(&self.up)
    }

    /// The down script.
    pub fn down_sql(&self) -> String {
        render_script(&self.down)
    }

    fn warn(&mut self, warning: GenerationWarning) {
        tracing::warn!(warning = %warning, "schema generation");
        self.warnings.push(warning);
    }
}

fn render_script(statements: &[String]) -> String {
    if statements.is_empty() {
        return String::new();
    }
    let mut script = statements
        .iter()
        .map(|s| format!("{};", s))
        .collect::<Vec<_>>()
        .join("\n\n");
    script.push('\n');
    script
}

/// Check if a live column differs from its declaration.
///
/// Compares normalized type, nullability and normalized default; the
/// auto-increment flag is compared only for the identity column.
pub fn column_needs_update(declared: &ColumnDescriptor, live: &LiveColumn, is_identity: bool) -> bool {
    if normalize_type(&declared.sql_type()) != normalize_type(&live.full_type) {
        return true;
    }
    if declared.nullable != live.nullable {
        return true;
    }
    let declared_default = declared.default.as_ref().map(|d| d.comparable_text());
    if normalize_default(declared_default.as_deref()) != normalize_default(live.default.as_deref()) {
        return true;
    }
    is_identity && declared.auto_increment != live.auto_increment
}

/// Derived join table name: singularized table names, sorted, joined by `_`.
pub fn join_table_name(left_table: &str, right_table: &str) -> String {
    let mut parts = [singularize(left_table), singularize(right_table)];
    parts.sort_unstable();
    format!("{}_{}", parts[0], parts[1])
}

/// Reject descriptors that cannot be rendered as a table.
fn validate(entity: &EntityDescriptor) -> Result<(), MigrationError> {
    let invalid = |message: &str| {
        Err(MigrationError::InvalidDescriptor {
            entity: entity.name.clone(),
            message: message.to_string(),
        })
    };

    if entity.name.trim().is_empty() {
        return invalid("entity name is empty");
    }
    if entity.table.trim().is_empty() {
        return invalid("table name is empty");
    }
    if entity.id_field.as_deref().is_some_and(|id| id.trim().is_empty()) {
        return invalid("identity field name is empty");
    }
    if entity.columns.iter().any(|c| c.stored_name().trim().is_empty()) {
        return invalid("column with an empty name");
    }
    if entity.ordered_columns().is_empty() && entity.many_to_one().next().is_none() {
        return invalid("no identity, columns or many-to-one relations to define a table");
    }
    let mut seen = HashSet::new();
    for column in entity.ordered_columns() {
        if !seen.insert(column.stored_name().to_string()) {
            return invalid(&format!("column `{}` declared twice", column.stored_name()));
        }
    }
    Ok(())
}

/// Generates migration SQL from entity descriptors and the live schema.
pub struct SchemaGenerator<'a> {
    introspector: SchemaIntrospector<'a>,
    renderer: DdlRenderer<'a>,
    catalog: Option<&'a EntityCatalog>,
}

/// Per-call state shared by the passes of one generation run.
struct Batch<'b> {
    order: ResolvedOrder<'b>,
}

impl<'a> SchemaGenerator<'a> {
    /// Create a generator over a connection.
    pub fn new(conn: &'a dyn Connection) -> Self {
        Self {
            introspector: SchemaIntrospector::for_connection(conn),
            renderer: DdlRenderer::new(conn),
            catalog: None,
        }
    }

    /// Resolve relation targets outside the batch through a catalog.
    pub fn with_catalog(mut self, catalog: &'a EntityCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Generate the migration SQL for a batch; empty when nothing changed.
    pub fn generate(&self, entities: &[EntityDescriptor]) -> Result<String, MigrationError> {
        Ok(self.generate_report(entities)?.up_sql())
    }

    /// Generate up and down scripts plus warnings for a batch.
    pub fn generate_report(
        &self,
        entities: &[EntityDescriptor],
    ) -> Result<GenerationReport, MigrationError> {
        for entity in entities {
            validate(entity)?;
        }

        let mut report = GenerationReport::default();
        let batch = Batch {
            order: DependencyResolver::resolve(entities),
        };

        if batch.order.has_cycle() {
            report.warn(GenerationWarning::DependencyCycle {
                entities: batch.order.cyclic.clone(),
            });
        }

        for (position, entity) in batch.order.entities.iter().enumerate() {
            let exists = self
                .introspector
                .table_exists(&entity.table)
                .map_err(MigrationError::introspection(&entity.table))?;

            if exists {
                let live = self
                    .introspector
                    .existing_columns(&entity.table)
                    .map_err(MigrationError::introspection(&entity.table))?;
                let live_keys = if entity.many_to_one().next().is_some() {
                    self.introspector
                        .foreign_keys(&entity.table)
                        .map_err(MigrationError::introspection(&entity.table))?
                } else {
                    Vec::new()
                };
                self.alter_table(entity, position, &live, &live_keys, &batch, &mut report)?;
            } else {
                self.create_table(entity, position, &batch, &mut report)?;
            }
        }

        self.join_tables(&batch, &mut report)?;

        report.down.reverse();
        tracing::info!(
            statements = report.up.len(),
            warnings = report.warnings.len(),
            "schema generation finished"
        );
        Ok(report)
    }

    fn create_table(
        &self,
        entity: &EntityDescriptor,
        position: usize,
        batch: &Batch<'_>,
        report: &mut GenerationReport,
    ) -> Result<(), MigrationError> {
        let mut definitions = Vec::new();

        for column in entity.ordered_columns() {
            let is_identity = entity.is_identity(column.stored_name());
            definitions.push(self.renderer.column_definition(&column, is_identity));
        }

        let implicit = self.implicit_foreign_key_columns(entity, batch);
        for column in &implicit {
            definitions.push(self.renderer.column_definition(column, false));
        }

        if let Some(id) = entity.identity_column() {
            if !self.renderer.is_rowid_alias(&id, true) {
                definitions.push(self.renderer.primary_key(&[id.stored_name()]));
            }
        }

        let mut indexes: Vec<(String, String, bool)> = entity
            .indexes
            .iter()
            .map(|i| (i.name.clone(), i.column.clone(), i.unique))
            .collect();
        for column in &implicit {
            if !entity.has_index_on(column.stored_name()) {
                let name = index_name(&entity.table, column.stored_name());
                indexes.push((name, column.stored_name().to_string(), false));
            }
        }

        let constraints: Vec<String> = self
            .foreign_keys(entity, position, batch, report, None)?
            .iter()
            .map(|fk| self.renderer.foreign_key_clause(&entity.table, fk))
            .collect();

        self.push_create(&entity.table, definitions, &indexes, constraints, report);
        Ok(())
    }

    /// Emit `CREATE TABLE` plus its indexes, inline or as trailing statements.
    fn push_create(
        &self,
        table: &str,
        mut definitions: Vec<String>,
        indexes: &[(String, String, bool)],
        constraints: Vec<String>,
        report: &mut GenerationReport,
    ) {
        let mut trailing = Vec::new();
        for (name, column, unique) in indexes {
            if self.renderer.inline_indexes() {
                definitions.push(self.renderer.index_clause(name, column, *unique));
            } else {
                trailing.push(self.renderer.create_index(table, name, column, *unique));
            }
        }
        definitions.extend(constraints);

        report.up.push(self.renderer.create_table(table, &definitions));
        report.up.extend(trailing);
        // Dropping the table drops its indexes.
        report.down.push(self.renderer.drop_table(table));
    }

    fn alter_table(
        &self,
        entity: &EntityDescriptor,
        position: usize,
        live: &LiveColumns,
        live_keys: &[LiveForeignKey],
        batch: &Batch<'_>,
        report: &mut GenerationReport,
    ) -> Result<(), MigrationError> {
        let table = &entity.table;
        // ALTER clauses; `down[i]` reverts `up[i]`.
        let mut up = Vec::new();
        let mut down = Vec::new();
        // Standalone statements run after the ALTER, and their reverts.
        let mut trailing_up = Vec::new();
        let mut trailing_down = Vec::new();

        for column in entity.ordered_columns() {
            let stored = column.stored_name();
            let is_identity = entity.is_identity(stored);
            let rendered = self.renderer.as_rendered(&column, is_identity);
            match live.get(stored) {
                None => {
                    self.check_addable(table, &column, is_identity)?;
                    up.push(format!(
                        "ADD COLUMN {}",
                        self.renderer.column_definition(&column, is_identity)
                    ));
                    down.push(format!("DROP COLUMN {}", quote_identifier(stored)));
                }
                Some(current) if column_needs_update(&rendered, current, is_identity) => {
                    tracing::debug!(
                        table = %table,
                        column = stored,
                        live_type = %current.full_type,
                        declared_type = %rendered.sql_type(),
                        "column drift"
                    );
                    if !self.renderer.alters_in_place() {
                        return Err(MigrationError::UnsupportedAlteration {
                            driver: self.renderer.driver(),
                            table: table.clone(),
                            column: stored.to_string(),
                            reason: format!(
                                "no in-place change from {} to {}; rebuild the table",
                                current.full_type,
                                rendered.sql_type()
                            ),
                        });
                    }
                    up.push(format!(
                        "MODIFY COLUMN {}",
                        self.renderer.column_definition(&column, is_identity)
                    ));
                    down.push(format!(
                        "MODIFY COLUMN {}",
                        self.renderer.live_column_definition(current)
                    ));
                }
                Some(_) => {}
            }
        }

        let added: Vec<ColumnDescriptor> = self
            .implicit_foreign_key_columns(entity, batch)
            .into_iter()
            .filter(|c| !live.contains_key(c.stored_name()))
            .collect();

        for column in &added {
            let stored = column.stored_name();
            self.check_addable(table, column, false)?;
            up.push(format!(
                "ADD COLUMN {}",
                self.renderer.column_definition(column, false)
            ));
            down.push(format!("DROP COLUMN {}", quote_identifier(stored)));

            if entity.has_index_on(stored) {
                continue;
            }
            let name = index_name(table, stored);
            if self.renderer.inline_indexes() {
                up.push(format!("ADD {}", self.renderer.index_clause(&name, stored, false)));
                down.push(format!("DROP INDEX {}", quote_identifier(&name)));
            } else {
                trailing_up.push(self.renderer.create_index(table, &name, stored, false));
                trailing_down.push(self.renderer.drop_index(table, &name));
            }
        }

        // Join columns without a live constraint, including ones deferred by
        // an earlier run.
        let unconstrained: HashSet<&str> = entity
            .many_to_one()
            .map(|(_, _, column)| column)
            .filter(|column| !live_keys.iter().any(|k| k.column == *column))
            .collect();

        if !unconstrained.is_empty() {
            for fk in self.foreign_keys(entity, position, batch, report, Some(&unconstrained))? {
                if !self.renderer.alters_in_place() {
                    report.warn(GenerationWarning::ForeignKeyRequiresRebuild {
                        table: table.clone(),
                        column: fk.column,
                        referenced_table: fk.referenced_table,
                    });
                    continue;
                }
                up.push(format!("ADD {}", self.renderer.foreign_key_clause(table, &fk)));
                down.push(format!(
                    "DROP FOREIGN KEY {}",
                    quote_identifier(&foreign_key_name(table, &fk.column))
                ));
            }
        }

        if up.is_empty() && trailing_up.is_empty() {
            return Ok(());
        }

        report.up.extend(self.renderer.alter_table(table, &up));
        report.up.extend(trailing_up);

        // `report.down` is reversed once the run ends; push in up order.
        down.reverse();
        report
            .down
            .extend(self.renderer.alter_table(table, &down).into_iter().rev());
        report.down.extend(trailing_down);
        Ok(())
    }

    /// Fail when the dialect cannot add the column to an existing table.
    fn check_addable(
        &self,
        table: &str,
        column: &ColumnDescriptor,
        is_identity: bool,
    ) -> Result<(), MigrationError> {
        match self.renderer.add_column_restriction(column, is_identity) {
            Some(reason) => Err(MigrationError::UnsupportedAlteration {
                driver: self.renderer.driver(),
                table: table.to_string(),
                column: column.stored_name().to_string(),
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Join columns of `ManyToOne` relations that are not declared columns.
    fn implicit_foreign_key_columns(
        &self,
        entity: &EntityDescriptor,
        batch: &Batch<'_>,
    ) -> Vec<ColumnDescriptor> {
        let mut seen = HashSet::new();
        let mut columns = Vec::new();
        for (_, target, join_column) in entity.many_to_one() {
            if entity.column_by_stored_name(join_column).is_some() || !seen.insert(join_column) {
                continue;
            }
            // The column mirrors the referenced identity type, INT when unknown.
            let column = match self.find_entity(target, batch).and_then(|t| t.identity_column()) {
                Some(id) => ColumnDescriptor {
                    length: id.length,
                    scale: id.scale,
                    ..ColumnDescriptor::new(join_column, id.column_type)
                },
                None => ColumnDescriptor::new(join_column, ColumnType::Integer),
            };
            columns.push(column);
        }
        columns
    }

    /// Foreign keys of `ManyToOne` relations whose target table is available.
    ///
    /// `only` restricts the result to the given join columns.
    fn foreign_keys(
        &self,
        entity: &EntityDescriptor,
        position: usize,
        batch: &Batch<'_>,
        report: &mut GenerationReport,
        only: Option<&HashSet<&str>>,
    ) -> Result<Vec<ForeignKey>, MigrationError> {
        let mut keys: Vec<ForeignKey> = Vec::new();
        for (relation, target, join_column) in entity.many_to_one() {
            if only.is_some_and(|cols| !cols.contains(join_column)) {
                continue;
            }
            if keys.iter().any(|k| k.column == join_column) {
                continue;
            }
            let Some(target_entity) = self.find_entity(target, batch) else {
                report.warn(GenerationWarning::MissingRelationTarget {
                    entity: entity.name.clone(),
                    field: relation.field.clone(),
                    target: target.to_string(),
                });
                continue;
            };

            if !self.target_available(entity, target_entity, Some(position), batch)? {
                report.warn(GenerationWarning::DeferredForeignKey {
                    table: entity.table.clone(),
                    column: join_column.to_string(),
                    referenced_table: target_entity.table.clone(),
                });
                continue;
            }

            keys.push(ForeignKey {
                column: join_column.to_string(),
                referenced_table: target_entity.table.clone(),
                referenced_column: target_entity.identity_column_name(),
            });
        }
        Ok(keys)
    }

    /// A referenced table is available when it is the table itself, is
    /// scheduled earlier in the batch, or already exists.
    ///
    /// `position` is `None` in the join-table pass, after every primary
    /// table of the batch has been emitted.
    fn target_available(
        &self,
        entity: &EntityDescriptor,
        target: &EntityDescriptor,
        position: Option<usize>,
        batch: &Batch<'_>,
    ) -> Result<bool, MigrationError> {
        if target.name == entity.name {
            return Ok(true);
        }
        if let Some(target_position) = batch.order.position(&target.name) {
            match position {
                None => return Ok(true),
                Some(current) if target_position < current => return Ok(true),
                Some(_) => {}
            }
        }
        self.introspector
            .table_exists(&target.table)
            .map_err(MigrationError::introspection(&target.table))
    }

    fn join_tables(&self, batch: &Batch<'_>, report: &mut GenerationReport) -> Result<(), MigrationError> {
        let mut seen = HashSet::new();

        for entity in &batch.order.entities {
            for relation in &entity.relations {
                let RelationKind::ManyToMany {
                    target_entity,
                    join_table,
                } = &relation.kind
                else {
                    continue;
                };

                let Some(target) = self.find_entity(target_entity, batch) else {
                    report.warn(GenerationWarning::MissingRelationTarget {
                        entity: entity.name.clone(),
                        field: relation.field.clone(),
                        target: target_entity.clone(),
                    });
                    continue;
                };

                let table = join_table
                    .clone()
                    .unwrap_or_else(|| join_table_name(&entity.table, &target.table));
                if !seen.insert(table.clone()) {
                    continue;
                }

                let exists = self
                    .introspector
                    .table_exists(&table)
                    .map_err(MigrationError::introspection(&table))?;
                if exists {
                    continue;
                }

                self.join_table(&table, entity, target, batch, report)?;
            }
        }
        Ok(())
    }

    fn join_table(
        &self,
        table: &str,
        source: &EntityDescriptor,
        target: &EntityDescriptor,
        batch: &Batch<'_>,
        report: &mut GenerationReport,
    ) -> Result<(), MigrationError> {
        let source_column = format!("{}_id", singularize(&source.table));
        let mut target_column = format!("{}_id", singularize(&target.table));
        if target_column == source_column {
            target_column = format!("related_{}", target_column);
        }

        let sides = [(&source_column, source), (&target_column, target)];
        let mut definitions = Vec::new();

        for (column, entity) in &sides {
            let mut def = entity
                .identity_column()
                .unwrap_or_else(|| ColumnDescriptor::identity(column.as_str()));
            def.field = column.to_string();
            def.stored_name = None;
            def.nullable = false;
            def.default = None;
            def.auto_increment = false;
            definitions.push(self.renderer.column_definition(&def, false));
        }

        definitions.push(
            self.renderer
                .primary_key(&[source_column.as_str(), target_column.as_str()]),
        );

        let indexes: Vec<(String, String, bool)> = sides
            .iter()
            .map(|(column, _)| (index_name(table, column), column.to_string(), false))
            .collect();

        let mut constraints = Vec::new();
        for (column, entity) in &sides {
            if !self.target_available(source, entity, None, batch)? {
                report.warn(GenerationWarning::DeferredForeignKey {
                    table: table.to_string(),
                    column: column.to_string(),
                    referenced_table: entity.table.clone(),
                });
                continue;
            }
            let fk = ForeignKey {
                column: column.to_string(),
                referenced_table: entity.table.clone(),
                referenced_column: entity.identity_column_name(),
            };
            constraints.push(self.renderer.foreign_key_clause(table, &fk));
        }

        self.push_create(table, definitions, &indexes, constraints, report);
        Ok(())
    }

    /// Look up an entity in the batch first, then in the catalog.
    fn find_entity<'s>(&'s self, name: &str, batch: &Batch<'s>) -> Option<&'s EntityDescriptor> {
        batch
            .order
            .entities
            .iter()
            .copied()
            .find(|e| e.name == name)
            .or_else(|| self.catalog.and_then(|c| c.get(name)))
    }
}
