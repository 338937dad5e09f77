//! Context-sensitive resolution of access chains against the class table.
//!
//! A chain like `self.weapon.Fire()` is resolved segment by segment: the
//! head against the local scope, `self`/`super`, the current class's
//! members (walking the ancestor chain, most-derived first) and finally
//! global class names; every later segment as a member of the class implied
//! by the previous segment's declared type.

use std::collections::HashSet;

use crate::chain::{segment_name, split_segments};
use crate::model::{
    ClassId, ClassTable, Declaration, FunctionSymbol, ParseState, SymbolKind, VarScope,
    VariableSymbol,
};

/// Ephemeral per-query state: what is visible at the cursor.
pub struct ResolutionContext<'a> {
    /// Local variables and parameters, nearest scope first.
    pub locals: &'a [VariableSymbol],
    /// Class enclosing the cursor, if known.
    pub current_class: Option<ClassId>,
    /// Normalized access chain (see [`crate::chain`]).
    pub chain: &'a str,
}

/// Outcome of a resolution request. `Pending` is a deferred-retry signal,
/// not an error: the named class is still being parsed and the caller
/// should retry once parsing completes.
#[derive(Debug, Clone)]
pub enum Resolution {
    Found(Declaration),
    NotFound { name: String },
    Pending { class: String },
}

enum MemberHit<'t> {
    Var(&'t VariableSymbol),
    Func(&'t FunctionSymbol),
}

/// Resolve a normalized chain. A trailing dot resolves to the *class* whose
/// members complete the chain; otherwise the terminal symbol itself.
pub fn resolve(table: &ClassTable, ctx: &ResolutionContext) -> Resolution {
    let (segments, trailing_dot) = split_segments(ctx.chain);
    let Some((head, rest)) = segments.split_first() else {
        return Resolution::NotFound {
            name: String::new(),
        };
    };

    let mut decl = match resolve_head(table, ctx, segment_name(head)) {
        Ok(decl) => decl,
        Err(outcome) => return outcome,
    };

    for segment in rest {
        let class_id = match declared_class(table, &decl) {
            Ok(id) => id,
            Err(outcome) => return outcome,
        };
        decl = match find_member(table, class_id, segment_name(segment)) {
            Ok(Some((hit, owner))) => member_decl(table, hit, owner),
            Ok(None) => {
                return Resolution::NotFound {
                    name: segment_name(segment).to_string(),
                };
            }
            Err(parsing) => return Resolution::Pending { class: parsing },
        };
    }

    if trailing_dot {
        return match declared_class(table, &decl) {
            Ok(id) => Resolution::Found(Declaration::for_class(id, table.get(id))),
            Err(outcome) => outcome,
        };
    }
    Resolution::Found(decl)
}

/// List completion candidates for the members of `start` and all its
/// ancestors, most-derived first. Shadowed names appear once, from the
/// most-derived declaring class. Variables and functions are separate
/// namespaces.
pub fn completions_in(table: &ClassTable, start: ClassId) -> Result<Vec<Declaration>, String> {
    let mut seen_vars = HashSet::new();
    let mut seen_funcs = HashSet::new();
    let mut out = Vec::new();

    let mut cursor = Some(start);
    while let Some(id) = cursor {
        let class = table.get(id);
        if class.state != ParseState::Parsed {
            return Err(class.name.clone());
        }
        for var in class.variables.iter().filter(|v| v.scope == VarScope::Member) {
            if seen_vars.insert(var.name.to_ascii_lowercase()) {
                out.push(Declaration::for_variable(var, &class.file, Some(id)));
            }
        }
        for func in &class.functions {
            if seen_funcs.insert(func.name.to_ascii_lowercase()) {
                out.push(Declaration::for_function(func, &class.file, Some(id)));
            }
        }
        cursor = class.parent;
    }
    Ok(out)
}

/// Completions for an empty chain: local scope, members of the current
/// class and its ancestors, then all class names.
pub fn toplevel_completions(
    table: &ClassTable,
    locals: &[VariableSymbol],
    current_class: Option<ClassId>,
) -> Result<Vec<Declaration>, String> {
    let mut out = Vec::new();
    let current_file = current_class.map(|id| table.get(id).file.clone());
    for var in locals {
        out.push(Declaration::for_variable(
            var,
            current_file.as_deref().unwrap_or(std::path::Path::new("")),
            current_class,
        ));
    }
    if let Some(id) = current_class {
        out.extend(completions_in(table, id)?);
    }
    for id in table.ids() {
        let class = table.get(id);
        if !class.cyclic {
            out.push(Declaration::for_class(id, class));
        }
    }
    Ok(out)
}

fn resolve_head(
    table: &ClassTable,
    ctx: &ResolutionContext,
    name: &str,
) -> Result<Declaration, Resolution> {
    if name.is_empty() {
        return Err(Resolution::NotFound {
            name: String::new(),
        });
    }

    // Local scope wins on name collision; the list is nearest-first so the
    // first match is the innermost declaration.
    if let Some(var) = ctx.locals.iter().find(|v| v.is_named(name)) {
        let file = ctx
            .current_class
            .map(|id| table.get(id).file.clone())
            .unwrap_or_default();
        return Ok(Declaration::for_variable(var, &file, ctx.current_class));
    }

    if name.eq_ignore_ascii_case("self") {
        return match ctx.current_class {
            Some(id) => Ok(Declaration::for_class(id, table.get(id))),
            None => Err(Resolution::NotFound {
                name: name.to_string(),
            }),
        };
    }
    if name.eq_ignore_ascii_case("super") {
        return match ctx.current_class.and_then(|id| table.get(id).parent) {
            Some(parent) => Ok(Declaration::for_class(parent, table.get(parent))),
            None => Err(Resolution::NotFound {
                name: name.to_string(),
            }),
        };
    }

    if let Some(id) = ctx.current_class {
        match find_member(table, id, name) {
            Ok(Some((hit, owner))) => return Ok(member_decl(table, hit, owner)),
            Ok(None) => {}
            Err(parsing) => return Err(Resolution::Pending { class: parsing }),
        }
    }

    if let Some(id) = table.find(name) {
        return Ok(Declaration::for_class(id, table.get(id)));
    }

    Err(Resolution::NotFound {
        name: name.to_string(),
    })
}

/// Class providing the members of the symbol `decl` refers to: the class
/// itself, or the class named by its declared/return type.
fn declared_class(table: &ClassTable, decl: &Declaration) -> Result<ClassId, Resolution> {
    let id = if decl.kind == SymbolKind::Class {
        match decl.origin {
            Some(id) => id,
            None => {
                return Err(Resolution::NotFound {
                    name: decl.name.clone(),
                });
            }
        }
    } else {
        let Some(type_name) = decl.type_name.as_deref().filter(|t| !t.is_empty()) else {
            return Err(Resolution::NotFound {
                name: decl.name.clone(),
            });
        };
        match table.find(type_name) {
            Some(id) => id,
            None => {
                return Err(Resolution::NotFound {
                    name: type_name.to_string(),
                });
            }
        }
    };

    let class = table.get(id);
    if class.state != ParseState::Parsed {
        return Err(Resolution::Pending {
            class: class.name.clone(),
        });
    }
    Ok(id)
}

/// Search `start` and its ancestor chain for a member, most-derived class
/// first (single-inheritance shadowing: the first hit wins). Variables are
/// searched before functions within each class. `Err` carries the name of
/// a class that is still being parsed.
fn find_member<'t>(
    table: &'t ClassTable,
    start: ClassId,
    name: &str,
) -> Result<Option<(MemberHit<'t>, ClassId)>, String> {
    let mut cursor = Some(start);
    while let Some(id) = cursor {
        let class = table.get(id);
        if class.state != ParseState::Parsed {
            return Err(class.name.clone());
        }
        if let Some(var) = class.find_variable(name) {
            return Ok(Some((MemberHit::Var(var), id)));
        }
        if let Some(func) = class.find_function(name) {
            return Ok(Some((MemberHit::Func(func), id)));
        }
        cursor = class.parent;
    }
    Ok(None)
}

fn member_decl(table: &ClassTable, hit: MemberHit<'_>, owner: ClassId) -> Declaration {
    let file = &table.get(owner).file;
    match hit {
        MemberHit::Var(var) => Declaration::for_variable(var, file, Some(owner)),
        MemberHit::Func(func) => Declaration::for_function(func, file, Some(owner)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ClassSymbol;
    use crate::{linker, parser};
    use std::path::{Path, PathBuf};

    fn fixture() -> ClassTable {
        let sources = [
            ("Object.uc", "class Object;\nfunction string Name();\n"),
            (
                "Pawn.uc",
                "class Pawn extends Object;\nvar int Health; // hit points\nvar Weapon CurrentWeapon;\n",
            ),
            (
                "Enemy.uc",
                "class Enemy extends Pawn;\nvar float Health; // shadows Pawn.Health\nevent TakeDamage(int Amount);\n",
            ),
            (
                "Weapon.uc",
                "class Weapon extends Object;\nvar int Ammo;\nfunction Weapon Reload();\n",
            ),
        ];
        let mut classes = Vec::new();
        for (file, text) in sources {
            classes.push(parser::parse_source(Path::new(file), text).expect("fixture parses"));
        }
        let mut table = ClassTable::from_classes(classes);
        linker::link(&mut table);
        table
    }

    fn ctx<'a>(
        table: &ClassTable,
        class: &str,
        locals: &'a [VariableSymbol],
        chain: &'a str,
    ) -> ResolutionContext<'a> {
        ResolutionContext {
            locals,
            current_class: table.find(class),
            chain,
        }
    }

    #[test]
    fn resolves_member_of_current_class() {
        let table = fixture();
        let res = resolve(&table, &ctx(&table, "Enemy", &[], "Health"));
        let Resolution::Found(decl) = res else {
            panic!("expected Found, got {res:?}");
        };
        assert_eq!(decl.kind, SymbolKind::Variable);
        // Shadowing: the Enemy declaration wins over Pawn's.
        assert_eq!(decl.file, PathBuf::from("Enemy.uc"));
        assert_eq!(decl.type_name.as_deref(), Some("float"));
    }

    #[test]
    fn resolves_inherited_member_from_ancestor() {
        let table = fixture();
        let res = resolve(&table, &ctx(&table, "Enemy", &[], "CurrentWeapon"));
        let Resolution::Found(decl) = res else {
            panic!("expected Found, got {res:?}");
        };
        assert_eq!(decl.file, PathBuf::from("Pawn.uc"));
    }

    #[test]
    fn walks_chain_through_declared_types() {
        let table = fixture();
        let res = resolve(&table, &ctx(&table, "Enemy", &[], "CurrentWeapon.Ammo"));
        let Resolution::Found(decl) = res else {
            panic!("expected Found, got {res:?}");
        };
        assert_eq!(decl.name, "Ammo");
        assert_eq!(decl.file, PathBuf::from("Weapon.uc"));
    }

    #[test]
    fn function_return_type_continues_the_chain() {
        let table = fixture();
        let res = resolve(&table, &ctx(&table, "Enemy", &[], "CurrentWeapon.Reload().Ammo"));
        let Resolution::Found(decl) = res else {
            panic!("expected Found, got {res:?}");
        };
        assert_eq!(decl.name, "Ammo");
    }

    #[test]
    fn local_scope_shadows_members() {
        let table = fixture();
        let locals = vec![VariableSymbol {
            name: "Health".into(),
            modifiers: vec![],
            type_name: "Weapon".into(),
            doc: None,
            line: 10,
            scope: VarScope::Local,
        }];
        let res = resolve(&table, &ctx(&table, "Enemy", &locals, "Health.Ammo"));
        let Resolution::Found(decl) = res else {
            panic!("expected Found, got {res:?}");
        };
        // The local's declared type, not the member's, drove the lookup.
        assert_eq!(decl.name, "Ammo");
    }

    #[test]
    fn self_lists_own_and_inherited_members() {
        let table = fixture();
        let res = resolve(&table, &ctx(&table, "Enemy", &[], "self."));
        let Resolution::Found(decl) = res else {
            panic!("expected Found, got {res:?}");
        };
        assert_eq!(decl.kind, SymbolKind::Class);
        let scope = decl.origin.expect("class id");
        let names: Vec<String> = completions_in(&table, scope)
            .expect("ready")
            .iter()
            .map(|d| d.name.clone())
            .collect();
        assert!(names.contains(&"TakeDamage".to_string()));
        assert!(names.contains(&"Health".to_string()));
        assert!(names.contains(&"CurrentWeapon".to_string()));
        assert!(names.contains(&"Name".to_string()));
        // Shadowed Pawn.Health must not appear twice.
        assert_eq!(names.iter().filter(|n| *n == "Health").count(), 1);
    }

    #[test]
    fn super_resolves_against_parent() {
        let table = fixture();
        let res = resolve(&table, &ctx(&table, "Enemy", &[], "super."));
        let Resolution::Found(decl) = res else {
            panic!("expected Found, got {res:?}");
        };
        assert_eq!(decl.name, "Pawn");

        let res = resolve(&table, &ctx(&table, "Enemy", &[], "super.Health"));
        let Resolution::Found(decl) = res else {
            panic!("expected Found, got {res:?}");
        };
        // Resolution starts at the parent, so Pawn's Health wins.
        assert_eq!(decl.file, PathBuf::from("Pawn.uc"));
    }

    #[test]
    fn global_class_names_resolve_last() {
        let table = fixture();
        let res = resolve(&table, &ctx(&table, "Enemy", &[], "Weapon."));
        let Resolution::Found(decl) = res else {
            panic!("expected Found, got {res:?}");
        };
        assert_eq!(decl.kind, SymbolKind::Class);
        assert_eq!(decl.name, "Weapon");
    }

    #[test]
    fn unknown_name_is_not_found() {
        let table = fixture();
        let res = resolve(&table, &ctx(&table, "Enemy", &[], "DoesNotExist"));
        assert!(matches!(res, Resolution::NotFound { name } if name == "DoesNotExist"));
    }

    #[test]
    fn parsing_class_yields_pending_not_notfound() {
        let mut table = fixture();
        let weapon = table.find("Weapon").unwrap();
        table.get_mut(weapon).state = ParseState::Parsing;

        let res = resolve(&table, &ctx(&table, "Enemy", &[], "CurrentWeapon.Ammo"));
        assert!(matches!(res, Resolution::Pending { class } if class == "Weapon"));

        let res = resolve(&table, &ctx(&table, "Enemy", &[], "CurrentWeapon."));
        assert!(matches!(res, Resolution::Pending { .. }));
    }

    #[test]
    fn case_insensitive_throughout() {
        let table = fixture();
        let res = resolve(&table, &ctx(&table, "Enemy", &[], "currentweapon.AMMO"));
        assert!(matches!(res, Resolution::Found(_)));
    }

    #[test]
    fn toplevel_includes_locals_members_and_classes() {
        let table = fixture();
        let locals = vec![VariableSymbol {
            name: "i".into(),
            modifiers: vec![],
            type_name: "int".into(),
            doc: None,
            line: 5,
            scope: VarScope::Local,
        }];
        let names: Vec<String> =
            toplevel_completions(&table, &locals, table.find("Enemy"))
                .expect("ready")
                .iter()
                .map(|d| d.name.clone())
                .collect();
        assert!(names.contains(&"i".to_string()));
        assert!(names.contains(&"TakeDamage".to_string()));
        assert!(names.contains(&"Weapon".to_string()));
    }

    #[test]
    fn cyclic_classes_are_excluded_from_toplevel() {
        let mut classes = vec![
            ClassSymbol::new("A", Some("B".into()), PathBuf::from("A.uc")),
            ClassSymbol::new("B", Some("A".into()), PathBuf::from("B.uc")),
        ];
        for c in &mut classes {
            c.state = ParseState::Parsed;
        }
        let mut table = ClassTable::from_classes(classes);
        linker::link(&mut table);
        let names: Vec<String> = toplevel_completions(&table, &[], None)
            .expect("ready")
            .iter()
            .map(|d| d.name.clone())
            .collect();
        assert!(names.is_empty());
    }
}
